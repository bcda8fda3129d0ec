/// Forwarding of item-level property changes.
///
/// Items that implement [`NotifyPropertyChanged`] can be tracked by the
/// collection holding them: every property change raised by a contained
/// item is republished by the collection as an `ItemChanged` event for the
/// item's index or key.
///
/// Whether a collection tracks items is decided once, at construction, by
/// choosing a `with_item_tracking` constructor. That constructor requires
/// the capability as a trait bound and stores the accessor as a plain
/// function pointer, so no runtime type checks are needed afterwards.
use crate::error::ObserverError;
use crate::event::PropertyChanged;
use crate::subject::{Subject, SubscriptionHandle};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// A value that raises property-changed notifications.
pub trait NotifyPropertyChanged {
    /// The subject this value raises its property changes on.
    fn property_changed(&self) -> &Subject<PropertyChanged>;
}

impl<T: NotifyPropertyChanged + ?Sized> NotifyPropertyChanged for Arc<T> {
    fn property_changed(&self) -> &Subject<PropertyChanged> {
        (**self).property_changed()
    }
}

/// Identity of an item's property-changed source.
///
/// Clones of an item sharing one subject have the same source id.
pub(crate) type SourceId = usize;

pub(crate) type Accessor<T> = for<'a> fn(&'a T) -> &'a Subject<PropertyChanged>;

type OnItemChanged = dyn Fn(SourceId) -> Result<(), ObserverError> + Send + Sync;

/// Keeps one listener per distinct tracked source, reference counted by
/// the number of times the source is contained.
pub(crate) struct ItemTracker<T> {
    accessor: Accessor<T>,
    on_change: Arc<OnItemChanged>,
    listeners: DashMap<SourceId, (SubscriptionHandle, usize)>,
}

impl<T> ItemTracker<T> {
    pub(crate) fn new(
        accessor: Accessor<T>,
        on_change: impl Fn(SourceId) -> Result<(), ObserverError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            accessor,
            on_change: Arc::new(on_change),
            listeners: DashMap::new(),
        }
    }

    /// Source id of `item`.
    pub(crate) fn source_of(&self, item: &T) -> SourceId {
        (self.accessor)(item).source_id()
    }

    /// Start (or re-count) listening to `item`.
    pub(crate) fn track(&self, item: &T) {
        let source = self.source_of(item);
        match self.listeners.entry(source) {
            Entry::Occupied(mut entry) => entry.get_mut().1 += 1,
            Entry::Vacant(entry) => {
                let on_change = Arc::clone(&self.on_change);
                let handle = (self.accessor)(item).try_subscribe(move |_: &PropertyChanged| {
                    on_change(source)
                });
                entry.insert((handle, 1));
            }
        }
    }

    /// Stop listening to one occurrence of `item`.
    pub(crate) fn untrack(&self, item: &T) {
        let source = self.source_of(item);
        if let Entry::Occupied(mut entry) = self.listeners.entry(source) {
            if entry.get().1 > 1 {
                entry.get_mut().1 -= 1;
            } else {
                let (handle, _) = entry.remove();
                drop(handle);
            }
        }
    }

    /// Stop listening to everything.
    pub(crate) fn clear(&self) {
        self.listeners.clear();
    }

    /// Number of distinct sources listened to.
    pub(crate) fn tracked_sources(&self) -> usize {
        self.listeners.len()
    }
}
