/// Vec-backed observable collection.
///
/// [`ObservableCollection`] is an unordered bag from the caller's point of
/// view: items are appended, removed by value and enumerated. Events are
/// still keyed by the index the item occupied, so the list-changed bridge
/// applies.
///
/// The storage and the notifier live in a shared, reference-counted
/// [`Shared`] state that [`crate::list::ObservableList`] reuses. Every
/// operation:
///
/// 1. collects its input,
/// 2. takes the storage lock and checks the lifecycle under it,
/// 3. mutates the storage and records the events,
/// 4. releases the lock and publishes the events.
///
/// Subscribers may therefore re-enter the collection from their callbacks.
///
/// # Example
///
/// ```ignore
/// use observable_collections::prelude::*;
///
/// let tags = ObservableCollection::new();
/// let _sub = tags.count_changes()?.subscribe(|n| println!("{n} tags"));
///
/// tags.add("rust")?;
/// tags.add_range(["tokio", "serde"])?;
/// tags.remove(&"rust")?;
/// ```
use crate::config::CollectionConfig;
use crate::error::{CollectionResult, ObserverError};
use crate::event::ChangeEvent;
use crate::legacy::{ListChangedEvent, translate};
use crate::notifier::{self, Notifier, Observed, Translate};
use crate::observable::Observable;
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::subject::Subject;
use crate::suppression::{NotificationChannel, SuppressionGuard};
use crate::tracking::{Accessor, ItemTracker, NotifyPropertyChanged, SourceId};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::info;

/// A batch of events, each paired with the count right after it applied.
pub(crate) type Batch<T> = Vec<(ChangeEvent<usize, T>, usize)>;

/// Storage, notifier and item tracker of an index-keyed collection.
pub(crate) struct Shared<T> {
    pub(crate) items: Mutex<Vec<T>>,
    pub(crate) notifier: Notifier<usize, T>,
    tracker: Option<ItemTracker<T>>,
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn build(
        config: &CollectionConfig,
        scheduler: Arc<dyn Scheduler>,
        items: Vec<T>,
        accessor: Option<Accessor<T>>,
    ) -> Arc<Self> {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<T>>| {
            let tracker = accessor.map(|accessor| {
                let weak = weak.clone();
                ItemTracker::new(accessor, move |source| match weak.upgrade() {
                    Some(shared) => shared
                        .item_property_changed(source)
                        .map_err(ObserverError::from),
                    None => Ok(()),
                })
            });

            Shared {
                items: Mutex::new(items),
                notifier: Notifier::with_scheduler(
                    config,
                    scheduler,
                    Some(translate::<T> as Translate<usize, T>),
                ),
                tracker,
            }
        });

        if let Some(tracker) = &shared.tracker {
            for item in shared.items.lock().iter() {
                tracker.track(item);
            }
        }
        shared
    }

    /// Start listening to `item`. Call with the storage lock held.
    pub(crate) fn track(&self, item: &T) {
        if let Some(tracker) = &self.tracker {
            tracker.track(item);
        }
    }

    /// Stop listening to `item`. Call with the storage lock held.
    pub(crate) fn untrack(&self, item: &T) {
        if let Some(tracker) = &self.tracker {
            tracker.untrack(item);
        }
    }

    /// Lock the storage, failing unless the collection is active.
    ///
    /// Disposal clears the storage under the same lock, so a mutation made
    /// through this guard either lands before the teardown or not at all.
    pub(crate) fn lock_active(&self) -> CollectionResult<MutexGuard<'_, Vec<T>>> {
        let items = self.items.lock();
        self.notifier.lifecycle().ensure_active()?;
        Ok(items)
    }

    pub(crate) fn tracks_items(&self) -> bool {
        self.tracker.is_some()
    }

    /// Republish a property change of a contained item.
    fn item_property_changed(&self, source: SourceId) -> CollectionResult<()> {
        let Some(tracker) = &self.tracker else {
            return Ok(());
        };
        if !self.notifier.lifecycle().is_active() {
            return Ok(());
        }

        let (events, count) = {
            let items = self.items.lock();
            let events: Vec<_> = items
                .iter()
                .enumerate()
                .filter(|(_, item)| tracker.source_of(item) == source)
                .map(|(index, item)| ChangeEvent::changed(index, item.clone(), item.clone()))
                .collect();
            (events, items.len())
        };

        for event in events {
            self.notifier.publish(event, count)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operations shared by the collection and the list
    // ------------------------------------------------------------------

    pub(crate) fn len(&self) -> CollectionResult<usize> {
        Ok(self.lock_active()?.len())
    }

    pub(crate) fn to_vec(&self) -> CollectionResult<Vec<T>> {
        Ok(self.lock_active()?.clone())
    }

    pub(crate) fn add(&self, item: T) -> CollectionResult<()> {
        let (event, count) = {
            let mut items = self.lock_active()?;
            self.track(&item);
            items.push(item.clone());
            (ChangeEvent::added(items.len() - 1, item), items.len())
        };
        self.notifier.publish(event, count)
    }

    pub(crate) fn add_range(&self, new_items: Vec<T>) -> CollectionResult<()> {
        let batch: Batch<T> = {
            let mut items = self.lock_active()?;
            new_items
                .into_iter()
                .map(|item| {
                    self.track(&item);
                    items.push(item.clone());
                    (ChangeEvent::added(items.len() - 1, item), items.len())
                })
                .collect()
        };
        self.notifier.publish_batch(batch)
    }

    /// Remove the item at `index`. Call with the storage lock held.
    pub(crate) fn remove_at_locked(&self, items: &mut Vec<T>, index: usize) -> T {
        let item = items.remove(index);
        self.untrack(&item);
        item
    }

    pub(crate) fn clear(&self) -> CollectionResult<()> {
        {
            let mut items = self.lock_active()?;
            for item in items.drain(..) {
                self.untrack(&item);
            }
        }
        self.notifier.publish_reset(0)
    }

    pub(crate) fn replace_all(&self, new_items: Vec<T>) -> CollectionResult<()> {
        let count = {
            let mut items = self.lock_active()?;
            for item in items.iter() {
                self.untrack(item);
            }
            for item in &new_items {
                self.track(item);
            }
            *items = new_items;
            items.len()
        };
        self.notifier.publish_reset(count)
    }

    pub(crate) fn reset(&self) -> CollectionResult<()> {
        let count = self.len()?;
        self.notifier.publish_reset(count)
    }

    pub(crate) fn list_changed(&self) -> CollectionResult<&Subject<ListChangedEvent>> {
        self.notifier.list_changed()
    }

    pub(crate) fn dispose(&self) {
        let disposed = self.notifier.lifecycle().dispose_with(|| {
            info!("Disposing collection");
            {
                let mut items = self.items.lock();
                if let Some(tracker) = &self.tracker {
                    tracker.clear();
                }
                items.clear();
            }
            self.notifier.teardown();
        });

        if disposed {
            self.notifier.close_unhandled();
            info!("Collection disposed");
        }
    }
}

impl<T> Shared<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn contains(&self, item: &T) -> CollectionResult<bool> {
        Ok(self.lock_active()?.contains(item))
    }

    pub(crate) fn index_of(&self, item: &T) -> CollectionResult<Option<usize>> {
        Ok(self.lock_active()?.iter().position(|existing| existing == item))
    }

    pub(crate) fn remove(&self, item: &T) -> CollectionResult<bool> {
        let removed = {
            let mut items = self.lock_active()?;
            items
                .iter()
                .position(|existing| existing == item)
                .map(|index| {
                    let item = self.remove_at_locked(&mut items, index);
                    (ChangeEvent::removed(index, item), items.len())
                })
        };

        match removed {
            Some((event, count)) => {
                self.notifier.publish(event, count)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the first occurrence of each item; returns how many were found.
    pub(crate) fn remove_range(&self, targets: Vec<T>) -> CollectionResult<usize> {
        let batch: Batch<T> = {
            let mut items = self.lock_active()?;
            let mut batch = Vec::with_capacity(targets.len());
            for target in &targets {
                if let Some(index) = items.iter().position(|existing| existing == target) {
                    let item = self.remove_at_locked(&mut items, index);
                    batch.push((ChangeEvent::removed(index, item), items.len()));
                }
            }
            batch
        };

        let removed = batch.len();
        self.notifier.publish_batch(batch)?;
        Ok(removed)
    }
}

impl<T> Observed for Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Key = usize;
    type Value = T;

    fn notifier(&self) -> &Notifier<usize, T> {
        &self.notifier
    }

    fn observed_count(&self) -> usize {
        self.items.lock().len()
    }
}

/// A thread-safe observable bag of items.
///
/// Cloning yields another handle to the same collection.
pub struct ObservableCollection<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObservableCollection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ObservableCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("len", &self.shared.items.lock().len())
            .field("notifier", &self.shared.notifier)
            .finish()
    }
}

impl<T> Default for ObservableCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ObservableCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> ObservableCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An empty collection with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// An empty collection.
    pub fn with_config(config: CollectionConfig) -> Self {
        Self::with_scheduler(config, Arc::new(ImmediateScheduler))
    }

    /// An empty collection delivering on `scheduler`.
    pub fn with_scheduler(config: CollectionConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            shared: Shared::build(&config, scheduler, Vec::new(), None),
        }
    }

    /// A collection holding `items`. No events are raised for them.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            shared: Shared::build(
                &CollectionConfig::default(),
                Arc::new(ImmediateScheduler),
                items,
                None,
            ),
        }
    }

    /// Add `item` at the end.
    pub fn add(&self, item: T) -> CollectionResult<()> {
        self.shared.add(item)
    }

    /// Add every item; the batch may collapse to one reset.
    pub fn add_range(&self, items: impl IntoIterator<Item = T>) -> CollectionResult<()> {
        self.shared.add_range(items.into_iter().collect())
    }

    /// Remove every item and emit a reset.
    pub fn clear(&self) -> CollectionResult<()> {
        self.shared.clear()
    }

    /// Replace the contents and emit a single reset.
    pub fn replace_all(&self, items: impl IntoIterator<Item = T>) -> CollectionResult<()> {
        self.shared.replace_all(items.into_iter().collect())
    }

    /// Emit a reset without changing anything.
    pub fn reset(&self) -> CollectionResult<()> {
        self.shared.reset()
    }

    /// Number of items.
    pub fn len(&self) -> CollectionResult<usize> {
        self.shared.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the current contents.
    pub fn to_vec(&self) -> CollectionResult<Vec<T>> {
        self.shared.to_vec()
    }

    /// The list-changed bridge stream.
    pub fn list_changed(&self) -> CollectionResult<&Subject<ListChangedEvent>> {
        self.shared.list_changed()
    }

    /// Whether property changes of contained items are republished.
    pub fn tracks_items(&self) -> bool {
        self.shared.tracks_items()
    }
}

impl<T> ObservableCollection<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Whether `item` is contained.
    pub fn contains(&self, item: &T) -> CollectionResult<bool> {
        self.shared.contains(item)
    }

    /// Remove the first occurrence of `item`.
    pub fn remove(&self, item: &T) -> CollectionResult<bool> {
        self.shared.remove(item)
    }

    /// Remove the first occurrence of each item. Items that are not found
    /// are skipped; returns how many were removed.
    pub fn remove_range(&self, items: impl IntoIterator<Item = T>) -> CollectionResult<usize> {
        self.shared.remove_range(items.into_iter().collect())
    }
}

impl<T> ObservableCollection<T>
where
    T: NotifyPropertyChanged + Clone + Send + Sync + 'static,
{
    /// A collection that republishes property changes of its items as
    /// item-changed events.
    pub fn with_item_tracking(config: CollectionConfig, items: Vec<T>) -> Self {
        Self::with_item_tracking_and_scheduler(config, Arc::new(ImmediateScheduler), items)
    }

    /// Like [`Self::with_item_tracking`], delivering through `scheduler`.
    pub fn with_item_tracking_and_scheduler(
        config: CollectionConfig,
        scheduler: Arc<dyn Scheduler>,
        items: Vec<T>,
    ) -> Self {
        Self {
            shared: Shared::build(
                &config,
                scheduler,
                items,
                Some(T::property_changed as Accessor<T>),
            ),
        }
    }
}

impl<T> Observable for ObservableCollection<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Key = usize;
    type Value = T;

    fn notifier(&self) -> &Notifier<usize, T> {
        &self.shared.notifier
    }

    fn suppress(
        &self,
        channel: NotificationChannel,
        signal_when_finished: bool,
    ) -> CollectionResult<SuppressionGuard> {
        notifier::suppress(&self.shared, channel, signal_when_finished)
    }

    fn dispose(&self) {
        self.shared.dispose();
    }
}
