/// Multicast subjects with explicit subscription handles.
///
/// A [`Subject`] keeps an ordered list of subscriber callbacks. Emitting takes
/// a snapshot of that list and releases the lock before invoking anything, so
/// callbacks may subscribe, unsubscribe or re-enter the owning collection
/// without deadlocking:
///
/// - A subscriber removed during an emission is still called in that round.
/// - A subscriber added during an emission is first called on the next one.
///
/// Dropping a [`SubscriptionHandle`] unsubscribes it.
///
/// # Example
///
/// ```ignore
/// use observable_collections::subject::Subject;
///
/// let subject = Subject::new();
/// let handle = subject.subscribe(|value: &u32| println!("got {value}"));
/// subject.emit(&7);
/// drop(handle); // no longer called
/// ```
use crate::error::ObserverError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Unique identifier of a subscription within one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Subscriber callback type.
pub type ObserverFn<T> = dyn Fn(&T) -> Result<(), ObserverError> + Send + Sync;

struct Registry<T> {
    observers: Mutex<Vec<(SubscriptionId, Arc<ObserverFn<T>>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<T> Unsubscribe for Registry<T> {
    fn unsubscribe(&self, id: SubscriptionId) {
        self.observers.lock().retain(|(sid, _)| *sid != id);
    }
}

/// A multicast notification source.
///
/// Cloning a subject yields another handle to the same subscriber list.
pub struct Subject<T> {
    registry: Arc<Registry<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observer_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subject<T> {
    /// Create a subject with no subscribers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.registry.observers.lock().len()
    }

    /// Whether the subject has been closed by its owner.
    pub fn is_closed(&self) -> bool {
        self.registry.closed.load(Ordering::Acquire)
    }

    /// Identity of the shared subscriber list; equal for all clones.
    pub(crate) fn source_id(&self) -> usize {
        Arc::as_ptr(&self.registry) as *const () as usize
    }

    /// Deliver `value` to every current subscriber.
    ///
    /// Every subscriber is called even if an earlier one fails; the errors
    /// are returned in subscription order.
    pub fn emit(&self, value: &T) -> Vec<ObserverError> {
        let snapshot: Vec<Arc<ObserverFn<T>>> = {
            let observers = self.registry.observers.lock();
            observers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        snapshot
            .into_iter()
            .filter_map(|cb| cb(value).err())
            .collect()
    }

    /// Drop all subscribers and reject new ones.
    pub(crate) fn close(&self) {
        self.registry.closed.store(true, Ordering::Release);
        self.registry.observers.lock().clear();
    }
}

impl<T: 'static> Subject<T> {
    /// Subscribe an infallible callback.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionHandle {
        self.try_subscribe(move |value| {
            observer(value);
            Ok(())
        })
    }

    /// Subscribe a callback that may fail.
    ///
    /// Failures are reported on the owning collection's unhandled-error
    /// stream.
    pub fn try_subscribe(
        &self,
        observer: impl Fn(&T) -> Result<(), ObserverError> + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));

        {
            let mut observers = self.registry.observers.lock();
            // Checked under the lock so a concurrent close cannot miss us.
            if self.is_closed() {
                return SubscriptionHandle::inert(id);
            }
            observers.push((id, Arc::new(observer)));
        }

        let registry: Weak<dyn Unsubscribe> =
            Arc::downgrade(&self.registry) as Weak<dyn Unsubscribe>;
        SubscriptionHandle {
            id,
            registry: Some(registry),
        }
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Subscribe a channel and return its receiving half.
    ///
    /// The subscription lives as long as the returned handle. Values sent
    /// after the receiver is dropped are discarded.
    pub fn receiver(&self) -> (SubscriptionHandle, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(move |value: &T| {
            // Receiver may have dropped.
            let _ = tx.send(value.clone());
        });
        (handle, rx)
    }
}

/// Handle to a live subscription. Dropping it unsubscribes.
#[must_use = "dropping the handle unsubscribes immediately"]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl SubscriptionHandle {
    fn inert(id: SubscriptionId) -> Self {
        Self { id, registry: None }
    }

    /// The subscription id.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the subscription was registered with an open subject.
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|registry| registry.strong_count() > 0)
    }

    /// Unsubscribe now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the subscription alive until the subject is closed or dropped.
    pub fn detach(mut self) {
        self.registry = None;
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.unsubscribe(self.id);
        }
    }
}
