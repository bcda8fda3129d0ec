//! # Observable Collections
//!
//! Thread-safe list, dictionary and collection types that tell you what
//! changed, coalesced and filtered the way data-binding consumers need it:
//!
//! - **Fine-grained events** - item added, removed, changed, moved
//! - **Reset coalescing** - bulk changes at or above a threshold collapse
//!   into a single reset
//! - **Suppression scopes** - four independently suppressible channels
//!   with RAII guards and optional catch-up signals
//! - **Multi-stream fan-out** - change, reset, count, list-changed and
//!   property-changed streams with a fixed delivery order
//! - **Safe teardown** - idempotent, race-free disposal
//!
//! ## Quick Start
//!
//! ```ignore
//! use observable_collections::prelude::*;
//!
//! fn main() -> CollectionResult<()> {
//!     let list = ObservableList::new();
//!
//!     let _changes = list.changes()?.subscribe(|event| println!("{:?}", event));
//!     let _count = list.count_changes()?.subscribe(|n| println!("count = {n}"));
//!
//!     list.add("a")?;                 // ItemAdded, count = 1
//!     list.add_range(vec!["b"; 150])?; // one Reset, count = 151
//!
//!     {
//!         let _quiet = list.suppress_change_notifications(true)?;
//!         list.clear()?;
//!         list.add("z")?;
//!     }                               // one Reset, count = 1
//!
//!     list.dispose();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Every collection owns its storage behind a single lock and a
//! [`Notifier`] that turns mutation facts into notifications:
//!
//! 1. **Threshold policy** (`threshold`) - decides whether a batch collapses
//! 2. **Suppression** (`suppression`) - per-channel tracking flags
//! 3. **Fan-out** (`notifier`) - ordered delivery through a [`Scheduler`]
//! 4. **Lifecycle** (`lifecycle`) - Active, Disposing, Disposed
//!
//! The storage lock is released before any subscriber runs, so callbacks
//! may re-enter the collection.
//!
//! ## Thread Safety
//!
//! All collections are `Send + Sync` and cheap to clone (an `Arc`
//! internally). Notifications for mutations made on one thread are
//! delivered in program order with the default [`ImmediateScheduler`];
//! with a [`QueuedScheduler`] they are delivered in queue order.

pub mod collection;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod event;
pub mod legacy;
pub mod lifecycle;
pub mod list;
pub mod notifier;
pub mod observable;
pub mod scheduler;
pub mod subject;
pub mod suppression;
pub mod threshold;
pub mod tracking;

// Public API exports
pub use collection::ObservableCollection;
pub use config::CollectionConfig;
pub use dictionary::ObservableDictionary;
pub use error::{CollectionError, CollectionResult, ObserverError, ObserverFault, Stream};
pub use event::{ChangeEvent, ChangeKind, PropertyChanged, PropertyName};
pub use legacy::{ListChangedEvent, ListChangedKind};
pub use lifecycle::LifecycleState;
pub use list::ObservableList;
pub use notifier::Notifier;
pub use observable::Observable;
pub use scheduler::{ImmediateScheduler, QueueWorker, QueuedScheduler, Scheduler, queued};
pub use subject::{Subject, SubscriptionHandle, SubscriptionId};
pub use suppression::{NotificationChannel, SuppressionGuard};
pub use threshold::{DEFAULT_RESET_THRESHOLD, should_collapse_to_reset};
pub use tracking::NotifyPropertyChanged;

/// Prelude module for convenient imports.
///
/// Import everything you need with:
/// ```ignore
/// use observable_collections::prelude::*;
/// ```
pub mod prelude {
    pub use crate::collection::ObservableCollection;
    pub use crate::config::CollectionConfig;
    pub use crate::dictionary::ObservableDictionary;
    pub use crate::error::{CollectionError, CollectionResult, ObserverError, ObserverFault};
    pub use crate::event::{ChangeEvent, ChangeKind, PropertyChanged, PropertyName};
    pub use crate::list::ObservableList;
    pub use crate::observable::Observable;
    pub use crate::scheduler::{ImmediateScheduler, Scheduler, queued};
    pub use crate::subject::{Subject, SubscriptionHandle};
    pub use crate::suppression::{NotificationChannel, SuppressionGuard};
    pub use crate::tracking::NotifyPropertyChanged;
}
