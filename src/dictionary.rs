/// HashMap-backed observable dictionary.
///
/// Events are keyed by the dictionary key. There is no list-changed bridge
/// for dictionaries.
///
/// Bulk operations apply every item they can and skip the rest:
///
/// - `try_*_range` return the keys that could not be applied.
/// - `add_range` / `remove_range` fail with [`CollectionError::PartialBatch`]
///   after applying the successful items. Nothing is rolled back.
///
/// The reset threshold is evaluated against the number of items that were
/// actually applied.
///
/// # Example
///
/// ```ignore
/// use observable_collections::prelude::*;
///
/// let prices = ObservableDictionary::new();
/// prices.add("apple", 3)?;
/// prices.add_or_update("apple", 4)?;
///
/// let failed = prices.try_add_range([("pear", 2), ("apple", 9)])?;
/// assert_eq!(failed, vec!["apple"]);
/// ```
use crate::config::CollectionConfig;
use crate::error::{CollectionError, CollectionResult, ObserverError};
use crate::event::ChangeEvent;
use crate::notifier::{self, Notifier, Observed};
use crate::observable::Observable;
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::suppression::{NotificationChannel, SuppressionGuard};
use crate::tracking::{Accessor, ItemTracker, NotifyPropertyChanged, SourceId};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use tracing::info;

type Batch<K, V> = Vec<(ChangeEvent<K, V>, usize)>;

struct Shared<K, V> {
    entries: Mutex<HashMap<K, V>>,
    notifier: Notifier<K, V>,
    tracker: Option<ItemTracker<V>>,
}

impl<K, V> Shared<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn build(
        config: &CollectionConfig,
        scheduler: Arc<dyn Scheduler>,
        entries: HashMap<K, V>,
        accessor: Option<Accessor<V>>,
    ) -> Arc<Self> {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<K, V>>| {
            let tracker = accessor.map(|accessor| {
                let weak = weak.clone();
                ItemTracker::new(accessor, move |source| match weak.upgrade() {
                    Some(shared) => shared
                        .value_property_changed(source)
                        .map_err(ObserverError::from),
                    None => Ok(()),
                })
            });

            Shared {
                entries: Mutex::new(entries),
                notifier: Notifier::with_scheduler(config, scheduler, None),
                tracker,
            }
        });

        if let Some(tracker) = &shared.tracker {
            for value in shared.entries.lock().values() {
                tracker.track(value);
            }
        }
        shared
    }

    /// Lock the storage, failing unless the dictionary is active.
    fn lock_active(&self) -> CollectionResult<MutexGuard<'_, HashMap<K, V>>> {
        let entries = self.entries.lock();
        self.notifier.lifecycle().ensure_active()?;
        Ok(entries)
    }

    fn track(&self, value: &V) {
        if let Some(tracker) = &self.tracker {
            tracker.track(value);
        }
    }

    fn untrack(&self, value: &V) {
        if let Some(tracker) = &self.tracker {
            tracker.untrack(value);
        }
    }

    fn value_property_changed(&self, source: SourceId) -> CollectionResult<()> {
        let Some(tracker) = &self.tracker else {
            return Ok(());
        };
        if !self.notifier.lifecycle().is_active() {
            return Ok(());
        }

        let (events, count) = {
            let entries = self.entries.lock();
            let events: Vec<_> = entries
                .iter()
                .filter(|(_, value)| tracker.source_of(value) == source)
                .map(|(key, value)| ChangeEvent::changed(key.clone(), value.clone(), value.clone()))
                .collect();
            (events, entries.len())
        };

        for event in events {
            self.notifier.publish(event, count)?;
        }
        Ok(())
    }

    /// Insert if absent. Call with the storage lock held.
    fn insert_new(
        &self,
        entries: &mut HashMap<K, V>,
        key: K,
        value: V,
    ) -> Option<ChangeEvent<K, V>> {
        match entries.entry(key) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                self.track(&value);
                let event = ChangeEvent::added(slot.key().clone(), value.clone());
                slot.insert(value);
                Some(event)
            }
        }
    }

    /// Insert or replace. Call with the storage lock held.
    fn upsert(&self, entries: &mut HashMap<K, V>, key: K, value: V) -> ChangeEvent<K, V> {
        self.track(&value);
        match entries.entry(key) {
            Entry::Occupied(mut slot) => {
                let old = slot.insert(value.clone());
                self.untrack(&old);
                ChangeEvent::changed(slot.key().clone(), old, value)
            }
            Entry::Vacant(slot) => {
                let event = ChangeEvent::added(slot.key().clone(), value.clone());
                slot.insert(value);
                event
            }
        }
    }

    /// Remove if present. Call with the storage lock held.
    fn take(&self, entries: &mut HashMap<K, V>, key: &K) -> Option<ChangeEvent<K, V>> {
        entries.remove_entry(key).map(|(key, value)| {
            self.untrack(&value);
            ChangeEvent::removed(key, value)
        })
    }

    fn publish_one(&self, event: ChangeEvent<K, V>, count: usize) -> CollectionResult<()> {
        self.notifier.publish(event, count)
    }

    fn dispose(&self) {
        let disposed = self.notifier.lifecycle().dispose_with(|| {
            info!("Disposing dictionary");
            {
                let mut entries = self.entries.lock();
                if let Some(tracker) = &self.tracker {
                    tracker.clear();
                }
                entries.clear();
            }
            self.notifier.teardown();
        });

        if disposed {
            self.notifier.close_unhandled();
            info!("Dictionary disposed");
        }
    }
}

impl<K, V> Observed for Shared<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn notifier(&self) -> &Notifier<K, V> {
        &self.notifier
    }

    fn observed_count(&self) -> usize {
        self.entries.lock().len()
    }
}

/// A thread-safe observable dictionary.
///
/// Cloning yields another handle to the same dictionary.
pub struct ObservableDictionary<K, V> {
    shared: Arc<Shared<K, V>>,
}

impl<K, V> Clone for ObservableDictionary<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, V> fmt::Debug for ObservableDictionary<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableDictionary")
            .field("len", &self.shared.entries.lock().len())
            .field("notifier", &self.shared.notifier)
            .finish()
    }
}

impl<K, V> Default for ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> From<HashMap<K, V>> for ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn from(entries: HashMap<K, V>) -> Self {
        Self::from_map(entries)
    }
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// An empty dictionary with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// An empty dictionary.
    pub fn with_config(config: CollectionConfig) -> Self {
        Self::with_scheduler(config, Arc::new(ImmediateScheduler))
    }

    /// An empty dictionary delivering on `scheduler`.
    pub fn with_scheduler(config: CollectionConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            shared: Shared::build(&config, scheduler, HashMap::new(), None),
        }
    }

    /// A dictionary holding `entries`. No events are raised for them.
    pub fn from_map(entries: HashMap<K, V>) -> Self {
        Self {
            shared: Shared::build(
                &CollectionConfig::default(),
                Arc::new(ImmediateScheduler),
                entries,
                None,
            ),
        }
    }

    // ------------------------------------------------------------------
    // Single-entry operations
    // ------------------------------------------------------------------

    /// Add `value` under `key`; fails if the key exists.
    pub fn add(&self, key: K, value: V) -> CollectionResult<()> {
        if self.try_add(key.clone(), value)? {
            Ok(())
        } else {
            Err(CollectionError::key_already_exists(&key))
        }
    }

    /// Add `value` under `key` unless the key exists.
    pub fn try_add(&self, key: K, value: V) -> CollectionResult<bool> {
        let (event, count) = {
            let mut entries = self.shared.lock_active()?;
            let event = self.shared.insert_new(&mut entries, key, value);
            (event, entries.len())
        };

        match event {
            Some(event) => {
                self.shared.publish_one(event, count)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Insert or replace; returns the previous value.
    pub fn add_or_update(&self, key: K, value: V) -> CollectionResult<Option<V>> {
        let (event, count) = {
            let mut entries = self.shared.lock_active()?;
            let event = self.shared.upsert(&mut entries, key, value);
            (event, entries.len())
        };

        let previous = match &event {
            ChangeEvent::ItemChanged { old_value, .. } => Some(old_value.clone()),
            _ => None,
        };
        self.shared.publish_one(event, count)?;
        Ok(previous)
    }

    /// Replace the value of an existing key; returns the previous value.
    pub fn update(&self, key: K, value: V) -> CollectionResult<V> {
        let (old, count) = {
            let mut entries = self.shared.lock_active()?;
            let Some(slot) = entries.get_mut(&key) else {
                return Err(CollectionError::key_not_found(&key));
            };
            self.shared.track(&value);
            let old = std::mem::replace(slot, value.clone());
            self.shared.untrack(&old);
            (old, entries.len())
        };

        self.shared
            .publish_one(ChangeEvent::changed(key, old.clone(), value), count)?;
        Ok(old)
    }

    /// Remove `key`; fails if it is absent.
    pub fn remove(&self, key: &K) -> CollectionResult<V> {
        self.try_remove(key)?
            .ok_or_else(|| CollectionError::key_not_found(key))
    }

    /// Remove `key` if present.
    pub fn try_remove(&self, key: &K) -> CollectionResult<Option<V>> {
        let (event, count) = {
            let mut entries = self.shared.lock_active()?;
            let event = self.shared.take(&mut entries, key);
            (event, entries.len())
        };

        let Some(event) = event else {
            return Ok(None);
        };
        let removed = match &event {
            ChangeEvent::ItemRemoved { value, .. } => Some(value.clone()),
            _ => None,
        };
        self.shared.publish_one(event, count)?;
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    /// Add every pair whose key is absent; returns the keys that already
    /// existed.
    pub fn try_add_range(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> CollectionResult<Vec<K>> {
        let pairs: Vec<_> = pairs.into_iter().collect();
        let mut failed = Vec::new();
        let batch: Batch<K, V> = {
            let mut entries = self.shared.lock_active()?;
            let mut batch = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                if entries.contains_key(&key) {
                    failed.push(key);
                } else if let Some(event) = self.shared.insert_new(&mut entries, key, value) {
                    batch.push((event, entries.len()));
                }
            }
            batch
        };

        self.shared.notifier.publish_batch(batch)?;
        Ok(failed)
    }

    /// Add every pair; fails with `PartialBatch` if any key already existed.
    pub fn add_range(&self, pairs: impl IntoIterator<Item = (K, V)>) -> CollectionResult<()> {
        let failed = self.try_add_range(pairs)?;
        partial(&failed)
    }

    /// Remove every present key; returns the keys that were absent.
    pub fn try_remove_range(&self, keys: impl IntoIterator<Item = K>) -> CollectionResult<Vec<K>> {
        let keys: Vec<K> = keys.into_iter().collect();
        let mut failed = Vec::new();
        let batch: Batch<K, V> = {
            let mut entries = self.shared.lock_active()?;
            let mut batch = Vec::with_capacity(keys.len());
            for key in keys {
                match self.shared.take(&mut entries, &key) {
                    Some(event) => batch.push((event, entries.len())),
                    None => failed.push(key),
                }
            }
            batch
        };

        self.shared.notifier.publish_batch(batch)?;
        Ok(failed)
    }

    /// Remove every key; fails with `PartialBatch` if any key was absent.
    pub fn remove_range(&self, keys: impl IntoIterator<Item = K>) -> CollectionResult<()> {
        let failed = self.try_remove_range(keys)?;
        partial(&failed)
    }

    /// Insert or replace every pair.
    pub fn add_or_update_range(
        &self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> CollectionResult<()> {
        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        let batch: Batch<K, V> = {
            let mut entries = self.shared.lock_active()?;
            pairs
                .into_iter()
                .map(|(key, value)| {
                    let event = self.shared.upsert(&mut entries, key, value);
                    (event, entries.len())
                })
                .collect()
        };
        self.shared.notifier.publish_batch(batch)
    }

    /// Remove every entry and emit a reset.
    pub fn clear(&self) -> CollectionResult<()> {
        {
            let mut entries = self.shared.lock_active()?;
            for (_, value) in entries.drain() {
                self.shared.untrack(&value);
            }
        }
        self.shared.notifier.publish_reset(0)
    }

    /// Emit a reset without changing anything.
    pub fn reset(&self) -> CollectionResult<()> {
        let count = self.len()?;
        self.shared.notifier.publish_reset(count)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The value under `key`.
    pub fn get(&self, key: &K) -> CollectionResult<Option<V>> {
        Ok(self.shared.lock_active()?.get(key).cloned())
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> CollectionResult<bool> {
        Ok(self.shared.lock_active()?.contains_key(key))
    }

    /// All keys, in no particular order.
    pub fn keys(&self) -> CollectionResult<Vec<K>> {
        Ok(self.shared.lock_active()?.keys().cloned().collect())
    }

    /// All values, in no particular order.
    pub fn values(&self) -> CollectionResult<Vec<V>> {
        Ok(self.shared.lock_active()?.values().cloned().collect())
    }

    /// Number of entries.
    pub fn len(&self) -> CollectionResult<usize> {
        Ok(self.shared.lock_active()?.len())
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> CollectionResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> CollectionResult<HashMap<K, V>> {
        Ok(self.shared.lock_active()?.clone())
    }

    /// Whether property changes of contained values are republished.
    pub fn tracks_values(&self) -> bool {
        self.shared.tracker.is_some()
    }
}

fn partial<K: fmt::Debug>(failed: &[K]) -> CollectionResult<()> {
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CollectionError::partial_batch(failed))
    }
}

impl<K, V> ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: NotifyPropertyChanged + Clone + Send + Sync + 'static,
{
    /// A dictionary that republishes property changes of its values as
    /// item-changed events for their keys.
    pub fn with_value_tracking(config: CollectionConfig, entries: HashMap<K, V>) -> Self {
        Self::with_value_tracking_and_scheduler(config, Arc::new(ImmediateScheduler), entries)
    }

    /// Like [`Self::with_value_tracking`], delivering through `scheduler`.
    pub fn with_value_tracking_and_scheduler(
        config: CollectionConfig,
        scheduler: Arc<dyn Scheduler>,
        entries: HashMap<K, V>,
    ) -> Self {
        Self {
            shared: Shared::build(
                &config,
                scheduler,
                entries,
                Some(V::property_changed as Accessor<V>),
            ),
        }
    }
}

impl<K, V> Observable for ObservableDictionary<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;

    fn notifier(&self) -> &Notifier<K, V> {
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
