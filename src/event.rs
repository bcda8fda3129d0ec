/// Change events emitted by observable collections.
///
/// A [`ChangeEvent`] is an immutable description of a single mutation. The
/// key type is the index for list-like collections and the key for
/// dictionaries. `ItemMoved` is only produced by lists.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// An item was added.
    ItemAdded,
    /// An item was removed.
    ItemRemoved,
    /// An item was replaced or one of its properties changed.
    ItemChanged,
    /// An item moved to another index.
    ItemMoved,
    /// The contents should be treated as fully replaced.
    Reset,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::ItemAdded => write!(f, "item-added"),
            ChangeKind::ItemRemoved => write!(f, "item-removed"),
            ChangeKind::ItemChanged => write!(f, "item-changed"),
            ChangeKind::ItemMoved => write!(f, "item-moved"),
            ChangeKind::Reset => write!(f, "reset"),
        }
    }
}

/// A change event notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent<K, V> {
    /// `value` was added at `key`.
    ItemAdded {
        /// Index or key of the new item.
        key: K,
        /// The added value.
        value: V,
    },
    /// `value` was removed from `key`.
    ItemRemoved {
        /// Index or key the item was removed from.
        key: K,
        /// The removed value.
        value: V,
    },
    /// The value at `key` changed.
    ItemChanged {
        /// Index or key of the changed item.
        key: K,
        /// Value before the change.
        old_value: V,
        /// Value after the change.
        new_value: V,
    },
    /// `value` moved from `old_index` to `new_index`.
    ItemMoved {
        /// Index before the move.
        old_index: usize,
        /// Index after the move.
        new_index: usize,
        /// The moved value.
        value: V,
    },
    /// Discard any incremental knowledge of the contents.
    Reset,
}

impl<K, V> ChangeEvent<K, V> {
    /// Create an item-added event.
    pub fn added(key: K, value: V) -> Self {
        ChangeEvent::ItemAdded { key, value }
    }

    /// Create an item-removed event.
    pub fn removed(key: K, value: V) -> Self {
        ChangeEvent::ItemRemoved { key, value }
    }

    /// Create an item-changed event.
    pub fn changed(key: K, old_value: V, new_value: V) -> Self {
        ChangeEvent::ItemChanged {
            key,
            old_value,
            new_value,
        }
    }

    /// Create an item-moved event.
    pub fn moved(old_index: usize, new_index: usize, value: V) -> Self {
        ChangeEvent::ItemMoved {
            old_index,
            new_index,
            value,
        }
    }

    /// The kind of this event.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::ItemAdded { .. } => ChangeKind::ItemAdded,
            ChangeEvent::ItemRemoved { .. } => ChangeKind::ItemRemoved,
            ChangeEvent::ItemChanged { .. } => ChangeKind::ItemChanged,
            ChangeEvent::ItemMoved { .. } => ChangeKind::ItemMoved,
            ChangeEvent::Reset => ChangeKind::Reset,
        }
    }

    /// Whether this is a reset.
    pub fn is_reset(&self) -> bool {
        matches!(self, ChangeEvent::Reset)
    }

    /// Whether this event can change the number of items.
    pub fn affects_count(&self) -> bool {
        matches!(
            self,
            ChangeEvent::ItemAdded { .. } | ChangeEvent::ItemRemoved { .. } | ChangeEvent::Reset
        )
    }

    /// The index or key of the affected item, if any.
    pub fn key(&self) -> Option<&K> {
        match self {
            ChangeEvent::ItemAdded { key, .. }
            | ChangeEvent::ItemRemoved { key, .. }
            | ChangeEvent::ItemChanged { key, .. } => Some(key),
            ChangeEvent::ItemMoved { .. } | ChangeEvent::Reset => None,
        }
    }
}

/// Names of the properties a collection raises property-changed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyName {
    /// Number of items.
    Count,
    /// The indexer; raised on every content change.
    Indexer,
    /// The all-changes tracking flag.
    IsTrackingChanges,
    /// The item-changes tracking flag.
    IsTrackingItemChanges,
    /// The count-changes tracking flag.
    IsTrackingCountChanges,
    /// The reset tracking flag.
    IsTrackingResets,
    /// The reset threshold.
    ResetThreshold,
    /// A property of a contained item (item tracking).
    Other(&'static str),
}

impl PropertyName {
    /// The binding name of this property.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::Count => "Count",
            PropertyName::Indexer => "Item[]",
            PropertyName::IsTrackingChanges => "IsTrackingChanges",
            PropertyName::IsTrackingItemChanges => "IsTrackingItemChanges",
            PropertyName::IsTrackingCountChanges => "IsTrackingCountChanges",
            PropertyName::IsTrackingResets => "IsTrackingResets",
            PropertyName::ResetThreshold => "ThresholdAmountWhenChangesAreNotifiedAsReset",
            PropertyName::Other(name) => *name,
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    /// The property that changed.
    pub name: PropertyName,
}

impl PropertyChanged {
    /// Create a notification for `name`.
    pub fn new(name: PropertyName) -> Self {
        Self { name }
    }
}
