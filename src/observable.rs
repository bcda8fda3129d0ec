/// The notification surface shared by every observable collection.
///
/// Each collection flavor implements the three required methods; streams,
/// suppression helpers, configuration accessors and lifecycle inspection
/// are provided on top of them. Every provided method except
/// [`Observable::unhandled_errors`], [`Observable::is_disposed`] and
/// [`Observable::is_disposing`] fails once disposal has begun.
///
/// # Example
///
/// ```ignore
/// use observable_collections::prelude::*;
///
/// let list = ObservableList::new();
/// let _changes = list.changes()?.subscribe(|event| println!("{:?}", event));
///
/// {
///     let _quiet = list.suppress_change_notifications(true)?;
///     for i in 0..1_000 {
///         list.add(i)?;
///     }
/// } // a single reset is emitted here
/// ```
use crate::error::{CollectionResult, ObserverFault};
use crate::event::{ChangeEvent, PropertyChanged};
use crate::notifier::Notifier;
use crate::subject::Subject;
use crate::suppression::{NotificationChannel, SuppressionGuard};

/// Common API of observable collections.
pub trait Observable {
    /// Index or key type of emitted events.
    type Key: Clone + Send + Sync + 'static;
    /// Item type of emitted events.
    type Value: Clone + Send + Sync + 'static;

    /// The fan-out engine of this collection.
    fn notifier(&self) -> &Notifier<Self::Key, Self::Value>;

    /// Suppress `channel` until the returned guard is released.
    ///
    /// If `signal_when_finished` is set, releasing the guard emits the
    /// current count (count channel) or a reset (every other channel).
    /// Fails with `AlreadySuppressed` if the channel is already suppressed.
    /// A flag-property observer that fails while the window opens is
    /// reported on [`Self::unhandled_errors`] and does not fail the call.
    fn suppress(
        &self,
        channel: NotificationChannel,
        signal_when_finished: bool,
    ) -> CollectionResult<SuppressionGuard>;

    /// Tear the collection down. Idempotent.
    fn dispose(&self);

    // ------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------

    /// The coalesced change-event stream.
    fn changes(&self) -> CollectionResult<&Subject<ChangeEvent<Self::Key, Self::Value>>> {
        self.notifier().changes()
    }

    /// Emits `()` for every reset.
    fn resets(&self) -> CollectionResult<&Subject<()>> {
        self.notifier().resets()
    }

    /// Emits the item count whenever it changes.
    fn count_changes(&self) -> CollectionResult<&Subject<usize>> {
        self.notifier().count_changes()
    }

    /// Property-changed notifications for `Count`, `Item[]` and the
    /// tracking flags.
    fn property_changed(&self) -> CollectionResult<&Subject<PropertyChanged>> {
        self.notifier().property_changed()
    }

    /// Faults raised by subscriber callbacks.
    fn unhandled_errors(&self) -> &Subject<ObserverFault> {
        self.notifier().unhandled_errors()
    }

    // ------------------------------------------------------------------
    // Suppression
    // ------------------------------------------------------------------

    /// Suppress every notification.
    fn suppress_change_notifications(
        &self,
        signal_reset_when_finished: bool,
    ) -> CollectionResult<SuppressionGuard> {
        self.suppress(NotificationChannel::AllChanges, signal_reset_when_finished)
    }

    /// Suppress item-changed events.
    fn suppress_item_changed_notifications(
        &self,
        signal_reset_when_finished: bool,
    ) -> CollectionResult<SuppressionGuard> {
        self.suppress(NotificationChannel::ItemChanges, signal_reset_when_finished)
    }

    /// Suppress count-change notifications.
    fn suppress_count_changed_notifications(
        &self,
        signal_current_count_when_finished: bool,
    ) -> CollectionResult<SuppressionGuard> {
        self.suppress(
            NotificationChannel::CountChanges,
            signal_current_count_when_finished,
        )
    }

    /// Suppress reset events.
    fn suppress_reset_notifications(
        &self,
        signal_reset_when_finished: bool,
    ) -> CollectionResult<SuppressionGuard> {
        self.suppress(NotificationChannel::Resets, signal_reset_when_finished)
    }

    /// Run `f` with `channel` suppressed.
    ///
    /// The channel is resumed even if `f` panics. A fault raised by the
    /// catch-up signal is returned after `f` completed.
    fn with_suppressed<R>(
        &self,
        channel: NotificationChannel,
        signal_when_finished: bool,
        f: impl FnOnce() -> R,
    ) -> CollectionResult<R> {
        let guard = self.suppress(channel, signal_when_finished)?;
        let result = f();
        guard.finish()?;
        Ok(result)
    }

    /// Whether any notification is delivered.
    fn is_tracking_changes(&self) -> CollectionResult<bool> {
        self.is_tracking(NotificationChannel::AllChanges)
    }

    /// Whether item-changed events are delivered.
    fn is_tracking_item_changes(&self) -> CollectionResult<bool> {
        self.is_tracking(NotificationChannel::ItemChanges)
    }

    /// Whether count changes are delivered.
    fn is_tracking_count_changes(&self) -> CollectionResult<bool> {
        self.is_tracking(NotificationChannel::CountChanges)
    }

    /// Whether resets are delivered.
    fn is_tracking_resets(&self) -> CollectionResult<bool> {
        self.is_tracking(NotificationChannel::Resets)
    }

    /// Whether `channel` is delivering.
    fn is_tracking(&self, channel: NotificationChannel) -> CollectionResult<bool> {
        self.notifier().lifecycle().ensure_active()?;
        Ok(self.notifier().is_tracking(channel))
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// The bulk-change count at or above which a reset is emitted instead.
    fn reset_threshold(&self) -> CollectionResult<usize> {
        self.notifier().lifecycle().ensure_active()?;
        Ok(self.notifier().reset_threshold())
    }

    /// Change the reset threshold.
    fn set_reset_threshold(&self, threshold: usize) -> CollectionResult<()> {
        self.notifier().set_reset_threshold(threshold)
    }

    /// Whether subscriber faults are returned to mutating callers.
    fn throws_on_observer_errors(&self) -> CollectionResult<bool> {
        self.notifier().lifecycle().ensure_active()?;
        Ok(self.notifier().throws_on_observer_errors())
    }

    /// Set whether subscriber faults are returned to mutating callers.
    fn set_throw_on_observer_errors(&self, enabled: bool) -> CollectionResult<()> {
        self.notifier().set_throw_on_observer_errors(enabled)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Whether disposal has completed.
    fn is_disposed(&self) -> bool {
        self.notifier().lifecycle().is_disposed()
    }

    /// Whether disposal is in progress.
    fn is_disposing(&self) -> bool {
        self.notifier().lifecycle().is_disposing()
    }
}
