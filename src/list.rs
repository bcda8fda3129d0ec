/// Indexed observable list.
///
/// [`ObservableList`] adds positional access to the operations of
/// [`crate::collection::ObservableCollection`]: get/set, insertion at an
/// index, removal by index or range, and moves. Index arguments are checked
/// against the length under the storage lock; out-of-range indices fail with
/// [`CollectionError::IndexOutOfRange`] without raising any event.
use crate::collection::{Batch, Shared};
use crate::config::CollectionConfig;
use crate::error::{CollectionError, CollectionResult};
use crate::event::ChangeEvent;
use crate::legacy::ListChangedEvent;
use crate::notifier::{self, Notifier};
use crate::observable::Observable;
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::subject::Subject;
use crate::suppression::{NotificationChannel, SuppressionGuard};
use crate::tracking::{Accessor, NotifyPropertyChanged};
use std::fmt;
use std::sync::Arc;

/// A thread-safe observable list.
///
/// Cloning yields another handle to the same list.
pub struct ObservableList<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("len", &self.shared.items.lock().len())
            .field("notifier", &self.shared.notifier)
            .finish()
    }
}

impl<T> Default for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

fn check_index(index: usize, len: usize) -> CollectionResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(CollectionError::IndexOutOfRange { index, len })
    }
}

impl<T> ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An empty list with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// An empty list.
    pub fn with_config(config: CollectionConfig) -> Self {
        Self::with_scheduler(config, Arc::new(ImmediateScheduler))
    }

    /// An empty list delivering on `scheduler`.
    pub fn with_scheduler(config: CollectionConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            shared: Shared::build(&config, scheduler, Vec::new(), None),
        }
    }

    /// A list holding `items`. No events are raised for them.
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

    /// Append `item`.
    pub fn add(&self, item: T) -> CollectionResult<()> {
        self.shared.add(item)
    }

    /// Append every item; the batch may collapse to one reset.
    pub fn add_range(&self, items: impl IntoIterator<Item = T>) -> CollectionResult<()> {
        self.shared.add_range(items.into_iter().collect())
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> CollectionResult<T> {
        let items = self.shared.lock_active()?;
        check_index(index, items.len())?;
        Ok(items[index].clone())
    }

    /// Replace the item at `index`; returns the previous item.
    pub fn set(&self, index: usize, item: T) -> CollectionResult<T> {
        let (old, count) = {
            let mut items = self.shared.lock_active()?;
            check_index(index, items.len())?;
            self.shared.track(&item);
            let old = std::mem::replace(&mut items[index], item.clone());
            self.shared.untrack(&old);
            (old, items.len())
        };

        self.shared
            .notifier
            .publish(ChangeEvent::changed(index, old.clone(), item), count)?;
        Ok(old)
    }

    /// Insert `item` at `index`; `index == len` appends.
    pub fn insert(&self, index: usize, item: T) -> CollectionResult<()> {
        let count = {
            let mut items = self.shared.lock_active()?;
            check_index(index, items.len() + 1)?;
            self.shared.track(&item);
            items.insert(index, item.clone());
            items.len()
        };
        self.shared
            .notifier
            .publish(ChangeEvent::added(index, item), count)
    }

    /// Insert every item starting at `index`, preserving their order.
    pub fn insert_range(
        &self,
        index: usize,
        items: impl IntoIterator<Item = T>,
    ) -> CollectionResult<()> {
        let new_items: Vec<T> = items.into_iter().collect();
        let batch: Batch<T> = {
            let mut items = self.shared.lock_active()?;
            check_index(index, items.len() + 1)?;
            let mut batch = Vec::with_capacity(new_items.len());
            for (offset, item) in new_items.into_iter().enumerate() {
                self.shared.track(&item);
                items.insert(index + offset, item.clone());
                batch.push((ChangeEvent::added(index + offset, item), items.len()));
            }
            batch
        };
        self.shared.notifier.publish_batch(batch)
    }

    /// Remove and return the item at `index`.
    pub fn remove_at(&self, index: usize) -> CollectionResult<T> {
        let (removed, count) = {
            let mut items = self.shared.lock_active()?;
            check_index(index, items.len())?;
            let removed = self.shared.remove_at_locked(&mut items, index);
            (removed, items.len())
        };

        self.shared
            .notifier
            .publish(ChangeEvent::removed(index, removed.clone()), count)?;
        Ok(removed)
    }

    /// Remove `count` items starting at `index` and return them.
    pub fn remove_range_at(&self, index: usize, count: usize) -> CollectionResult<Vec<T>> {
        let (removed, batch) = {
            let mut items = self.shared.lock_active()?;
            let len = items.len();
            let end = index
                .checked_add(count)
                .filter(|end| *end <= len)
                .ok_or(CollectionError::IndexOutOfRange {
                    index: index.saturating_add(count),
                    len,
                })?;

            let mut removed = Vec::with_capacity(count);
            let mut batch: Batch<T> = Vec::with_capacity(count);
            for _ in index..end {
                // Later items shift down into `index`.
                let item = self.shared.remove_at_locked(&mut items, index);
                batch.push((ChangeEvent::removed(index, item.clone()), items.len()));
                removed.push(item);
            }
            (removed, batch)
        };

        self.shared.notifier.publish_batch(batch)?;
        Ok(removed)
    }

    /// Move the item at `old_index` to `new_index`.
    ///
    /// Moving an item onto its own index is a no-op.
    pub fn move_item(&self, old_index: usize, new_index: usize) -> CollectionResult<()> {
        let (item, count) = {
            let mut items = self.shared.lock_active()?;
            check_index(old_index, items.len())?;
            check_index(new_index, items.len())?;
            if old_index == new_index {
                return Ok(());
            }
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            (item, items.len())
        };
        self.shared
            .notifier
            .publish(ChangeEvent::moved(old_index, new_index, item), count)
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

    /// Whether the list is empty.
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

impl<T> ObservableList<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Whether `item` is contained.
    pub fn contains(&self, item: &T) -> CollectionResult<bool> {
        self.shared.contains(item)
    }

    /// Index of the first occurrence of `item`.
    pub fn index_of(&self, item: &T) -> CollectionResult<Option<usize>> {
        self.shared.index_of(item)
    }

    /// Remove the first occurrence of `item`.
    pub fn remove(&self, item: &T) -> CollectionResult<bool> {
        self.shared.remove(item)
    }

    /// Remove the first occurrence of each item; returns how many were
    /// found.
    pub fn remove_range(&self, items: impl IntoIterator<Item = T>) -> CollectionResult<usize> {
        self.shared.remove_range(items.into_iter().collect())
    }
}

impl<T> ObservableList<T>
where
    T: NotifyPropertyChanged + Clone + Send + Sync + 'static,
{
    /// A list that republishes property changes of its items as
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

impl<T> Observable for ObservableList<T>
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
