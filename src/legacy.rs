/// Index-based list-changed notifications for binding consumers.
///
/// This is a stateless translation of [`ChangeEvent`]s keyed by index into
/// the flat shape older property-grid and list-binding code expects.
use crate::event::ChangeEvent;
use serde::{Deserialize, Serialize};

/// Kind of a list-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListChangedKind {
    /// The list was reset.
    Reset,
    /// An item was added at `new_index`.
    ItemAdded,
    /// An item was deleted at `new_index`.
    ItemDeleted,
    /// The item at `new_index` changed.
    ItemChanged,
    /// An item moved from `old_index` to `new_index`.
    ItemMoved,
}

/// A list-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListChangedEvent {
    /// What happened.
    pub kind: ListChangedKind,
    /// Affected index; `None` for resets.
    pub new_index: Option<usize>,
    /// Previous index; only set for moves.
    pub old_index: Option<usize>,
}

impl ListChangedEvent {
    /// A reset notification.
    pub fn reset() -> Self {
        Self {
            kind: ListChangedKind::Reset,
            new_index: None,
            old_index: None,
        }
    }

    fn at(kind: ListChangedKind, index: usize) -> Self {
        Self {
            kind,
            new_index: Some(index),
            old_index: None,
        }
    }
}

/// Translate an index-keyed change event.
pub fn translate<V>(event: &ChangeEvent<usize, V>) -> ListChangedEvent {
    match event {
        ChangeEvent::ItemAdded { key, .. } => {
            ListChangedEvent::at(ListChangedKind::ItemAdded, *key)
        }
        ChangeEvent::ItemRemoved { key, .. } => {
            ListChangedEvent::at(ListChangedKind::ItemDeleted, *key)
        }
        ChangeEvent::ItemChanged { key, .. } => {
            ListChangedEvent::at(ListChangedKind::ItemChanged, *key)
        }
        ChangeEvent::ItemMoved {
            old_index,
            new_index,
            ..
        } => ListChangedEvent {
            kind: ListChangedKind::ItemMoved,
            new_index: Some(*new_index),
            old_index: Some(*old_index),
        },
        ChangeEvent::Reset => ListChangedEvent::reset(),
    }
}
