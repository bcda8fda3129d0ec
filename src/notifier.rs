/// Notification fan-out engine shared by every collection flavor.
///
/// A collection mutates its storage under its own lock, releases the lock,
/// and hands the resulting [`ChangeEvent`] to its [`Notifier`] together with
/// the item count observed right after the mutation. The notifier then:
///
/// 1. checks the lifecycle (events published while disposing are dropped),
/// 2. collapses the event to a reset if the threshold says so,
/// 3. filters it through the suppression channels,
/// 4. fans it out, in this order, to the change stream (and reset stream),
///    the count stream (distinct values only), the list-changed stream and
///    the property-changed stream.
///
/// Every delivery is a task on the configured [`Scheduler`]. A subscriber
/// fault is reported on the unhandled-error stream and, when the scheduler
/// ran the task inline and `throw_on_observer_errors` is set, returned to
/// the publisher. Returning a fault skips the remaining streams of that
/// publish.
use crate::config::CollectionConfig;
use crate::error::{CollectionError, CollectionResult, ObserverFault, Stream};
use crate::event::{ChangeEvent, PropertyChanged, PropertyName};
use crate::legacy::ListChangedEvent;
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::scheduler::{ImmediateScheduler, Scheduler};
use crate::subject::Subject;
use crate::suppression::{NotificationChannel, Suppression, SuppressionGuard};
use crate::threshold::should_collapse_to_reset;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{trace, warn};

/// Maps a change event onto the list-changed shape.
pub type Translate<K, V> = fn(&ChangeEvent<K, V>) -> ListChangedEvent;

/// The fan-out engine of one collection instance.
pub struct Notifier<K, V> {
    lifecycle: Lifecycle,
    suppression: Suppression,
    reset_threshold: AtomicUsize,
    throw_on_observer_errors: AtomicBool,
    scheduler: Arc<dyn Scheduler>,

    changes: Subject<ChangeEvent<K, V>>,
    resets: Subject<()>,
    count: Subject<usize>,
    list_changed: Option<(Subject<ListChangedEvent>, Translate<K, V>)>,
    property_changed: Subject<PropertyChanged>,
    unhandled: Subject<ObserverFault>,

    last_count: Mutex<Option<usize>>,
}

impl<K, V> fmt::Debug for Notifier<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("state", &self.lifecycle.state())
            .field("reset_threshold", &self.reset_threshold.load(Ordering::Relaxed))
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<K, V> Notifier<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a notifier delivering on the immediate scheduler.
    pub fn new(config: &CollectionConfig, list_changed: Option<Translate<K, V>>) -> Self {
        Self::with_scheduler(config, Arc::new(ImmediateScheduler), list_changed)
    }

    /// Create a notifier delivering on `scheduler`.
    pub fn with_scheduler(
        config: &CollectionConfig,
        scheduler: Arc<dyn Scheduler>,
        list_changed: Option<Translate<K, V>>,
    ) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            suppression: Suppression::new(),
            reset_threshold: AtomicUsize::new(config.reset_threshold),
            throw_on_observer_errors: AtomicBool::new(config.throw_on_observer_errors),
            scheduler,
            changes: Subject::new(),
            resets: Subject::new(),
            count: Subject::new(),
            list_changed: list_changed.map(|translate| (Subject::new(), translate)),
            property_changed: Subject::new(),
            unhandled: Subject::new(),
            last_count: Mutex::new(None),
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// The lifecycle of the owning collection.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Whether `channel` is currently delivering.
    pub fn is_tracking(&self, channel: NotificationChannel) -> bool {
        self.suppression.is_tracking(channel)
    }

    /// Current reset threshold.
    pub fn reset_threshold(&self) -> usize {
        self.reset_threshold.load(Ordering::Acquire)
    }

    /// Change the reset threshold and raise property-changed for it.
    pub fn set_reset_threshold(&self, threshold: usize) -> CollectionResult<()> {
        self.lifecycle.ensure_active()?;
        if self.reset_threshold.swap(threshold, Ordering::AcqRel) != threshold {
            self.raise_property_changed(PropertyName::ResetThreshold)?;
        }
        Ok(())
    }

    /// Whether subscriber faults are returned to the publisher.
    pub fn throws_on_observer_errors(&self) -> bool {
        self.throw_on_observer_errors.load(Ordering::Acquire)
    }

    /// Set whether subscriber faults are returned to the publisher.
    pub fn set_throw_on_observer_errors(&self, enabled: bool) -> CollectionResult<()> {
        self.lifecycle.ensure_active()?;
        self.throw_on_observer_errors.store(enabled, Ordering::Release);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Streams
    // ------------------------------------------------------------------

    /// The coalesced change-event stream.
    pub fn changes(&self) -> CollectionResult<&Subject<ChangeEvent<K, V>>> {
        self.lifecycle.ensure_active()?;
        Ok(&self.changes)
    }

    /// The reset-only stream.
    pub fn resets(&self) -> CollectionResult<&Subject<()>> {
        self.lifecycle.ensure_active()?;
        Ok(&self.resets)
    }

    /// The distinct count stream.
    pub fn count_changes(&self) -> CollectionResult<&Subject<usize>> {
        self.lifecycle.ensure_active()?;
        Ok(&self.count)
    }

    /// The list-changed stream, if this collection is index-keyed.
    pub fn list_changed(&self) -> CollectionResult<&Subject<ListChangedEvent>> {
        self.lifecycle.ensure_active()?;
        self.list_changed
            .as_ref()
            .map(|(subject, _)| subject)
            .ok_or_else(|| {
                CollectionError::invalid_operation("collection has no list-changed stream")
            })
    }

    /// The property-changed stream.
    pub fn property_changed(&self) -> CollectionResult<&Subject<PropertyChanged>> {
        self.lifecycle.ensure_active()?;
        Ok(&self.property_changed)
    }

    /// The unhandled-error stream. Available in every lifecycle state.
    pub fn unhandled_errors(&self) -> &Subject<ObserverFault> {
        &self.unhandled
    }

    // ------------------------------------------------------------------
    // Publishing
    // ------------------------------------------------------------------

    /// Publish the result of a single-item operation.
    ///
    /// `count` is the number of items right after the mutation.
    pub fn publish(&self, event: ChangeEvent<K, V>, count: usize) -> CollectionResult<()> {
        if !self.accepts_publish()? {
            return Ok(());
        }

        let event = if event.is_reset() || should_collapse_to_reset(1, self.reset_threshold())? {
            ChangeEvent::Reset
        } else {
            event
        };

        self.dispatch(event, count)
    }

    /// Publish the results of a bulk operation.
    ///
    /// Each event carries the count observed after it was applied. The
    /// threshold is evaluated once for the whole batch; if it collapses, a
    /// single reset is published with the final count. Otherwise every
    /// event is published individually without re-evaluation.
    pub fn publish_batch(&self, events: Vec<(ChangeEvent<K, V>, usize)>) -> CollectionResult<()> {
        let Some(&(_, final_count)) = events.last() else {
            return Ok(());
        };

        if !self.accepts_publish()? {
            return Ok(());
        }

        if should_collapse_to_reset(events.len(), self.reset_threshold())? {
            trace!(
                "Collapsing batch of {} changes into a reset (threshold {})",
                events.len(),
                self.reset_threshold()
            );
            return self.dispatch(ChangeEvent::Reset, final_count);
        }

        for (event, count) in events {
            self.dispatch(event, count)?;
        }
        Ok(())
    }

    /// Publish a reset without any mutation.
    pub fn publish_reset(&self, count: usize) -> CollectionResult<()> {
        self.publish(ChangeEvent::Reset, count)
    }

    fn accepts_publish(&self) -> CollectionResult<bool> {
        match self.lifecycle.state() {
            LifecycleState::Active => Ok(true),
            // An operation that passed its entry check before disposal began.
            LifecycleState::Disposing => Ok(false),
            LifecycleState::Disposed => Err(CollectionError::Disposed),
        }
    }

    fn dispatch(&self, event: ChangeEvent<K, V>, count: usize) -> CollectionResult<()> {
        if !self.is_tracking(NotificationChannel::AllChanges) {
            return Ok(());
        }
        if event.is_reset() && !self.is_tracking(NotificationChannel::Resets) {
            return Ok(());
        }
        if matches!(event, ChangeEvent::ItemChanged { .. })
            && !self.is_tracking(NotificationChannel::ItemChanges)
        {
            return Ok(());
        }

        let is_reset = event.is_reset();
        let affects_count = event.affects_count();
        let legacy = self
            .list_changed
            .as_ref()
            .map(|(subject, translate)| (subject, translate(&event)));

        self.deliver(Stream::Changes, &self.changes, event)?;
        if is_reset {
            self.deliver(Stream::Resets, &self.resets, ())?;
        }

        let count_delivered = affects_count
            && self.is_tracking(NotificationChannel::CountChanges)
            && self.record_count(count);
        if count_delivered {
            self.deliver(Stream::Count, &self.count, count)?;
        }

        if let Some((subject, legacy)) = legacy {
            self.deliver(Stream::ListChanged, subject, legacy)?;
        }

        if count_delivered {
            self.raise_property_changed(PropertyName::Count)?;
        }
        self.raise_property_changed(PropertyName::Indexer)
    }

    /// Remember `count` as delivered; false if it equals the previous one.
    fn record_count(&self, count: usize) -> bool {
        let mut last = self.last_count.lock();
        if *last == Some(count) {
            return false;
        }
        *last = Some(count);
        true
    }

    fn raise_property_changed(&self, name: PropertyName) -> CollectionResult<()> {
        self.deliver(
            Stream::PropertyChanged,
            &self.property_changed,
            PropertyChanged::new(name),
        )
    }

    fn deliver<T: Send + 'static>(
        &self,
        stream: Stream,
        subject: &Subject<T>,
        value: T,
    ) -> CollectionResult<()> {
        let first_fault: Arc<Mutex<Option<ObserverFault>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&first_fault);
        let subject = subject.clone();
        let unhandled = self.unhandled.clone();
        self.scheduler.schedule(Box::new(move || {
            for error in subject.emit(&value) {
                let fault = ObserverFault { stream, error };
                report_fault(&unhandled, &fault);
                slot.lock().get_or_insert(fault);
            }
        }));

        // Only populated if the scheduler ran the task inline.
        let fault = first_fault.lock().take();
        match fault {
            Some(fault) if self.throws_on_observer_errors() => Err(fault.into()),
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Suppression
    // ------------------------------------------------------------------

    fn begin_suppression(&self, channel: NotificationChannel) -> CollectionResult<()> {
        self.lifecycle.ensure_active()?;
        self.suppression.begin(channel)?;
        // The window is open now; a failing flag observer must not leak it.
        // Its fault was already reported on the unhandled stream.
        if let Err(e) = self.raise_property_changed(channel.property_name()) {
            warn!("Suppression of {} began despite a flag observer fault: {}", channel, e);
        }
        Ok(())
    }

    fn end_suppression(
        &self,
        channel: NotificationChannel,
        signal: bool,
        count: usize,
    ) -> CollectionResult<()> {
        self.suppression.end(channel);
        if !self.lifecycle.is_active() {
            return Ok(());
        }

        let signalled = if signal {
            match channel {
                NotificationChannel::CountChanges => self.signal_count(count),
                NotificationChannel::AllChanges
                | NotificationChannel::ItemChanges
                | NotificationChannel::Resets => self.dispatch(ChangeEvent::Reset, count),
            }
        } else {
            Ok(())
        };
        let raised = self.raise_property_changed(channel.property_name());

        signalled.and(raised)
    }

    fn signal_count(&self, count: usize) -> CollectionResult<()> {
        if !self.is_tracking(NotificationChannel::AllChanges) {
            return Ok(());
        }
        *self.last_count.lock() = Some(count);
        self.deliver(Stream::Count, &self.count, count)?;
        self.raise_property_changed(PropertyName::Count)
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Emit the final reset and close every stream but the unhandled-error
    /// one. Must run inside the Disposing state.
    ///
    /// Closing is scheduled behind the final deliveries so a deferred
    /// scheduler still hands them to the current subscribers.
    pub(crate) fn teardown(&self) {
        if let Err(e) = self.dispatch(ChangeEvent::Reset, 0) {
            warn!("Teardown reset delivery failed: {}", e);
        }

        let changes = self.changes.clone();
        let resets = self.resets.clone();
        let count = self.count.clone();
        let list_changed = self.list_changed.as_ref().map(|(subject, _)| subject.clone());
        let property_changed = self.property_changed.clone();
        self.scheduler.schedule(Box::new(move || {
            changes.close();
            resets.close();
            count.close();
            if let Some(subject) = list_changed {
                subject.close();
            }
            property_changed.close();
        }));
    }

    /// Close the unhandled-error stream once disposal has completed.
    pub(crate) fn close_unhandled(&self) {
        let unhandled = self.unhandled.clone();
        self.scheduler.schedule(Box::new(move || unhandled.close()));
    }
}

fn report_fault(unhandled: &Subject<ObserverFault>, fault: &ObserverFault) {
    warn!("{}", fault);
    for error in unhandled.emit(fault) {
        warn!("Unhandled-error observer failed: {}", error);
    }
}

/// Implemented by the shared state of every collection so suppression
/// guards can reach the notifier and the current count after the caller's
/// borrow has ended.
pub(crate) trait Observed: Send + Sync + 'static {
    type Key: Clone + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    fn notifier(&self) -> &Notifier<Self::Key, Self::Value>;
    fn observed_count(&self) -> usize;
}

/// Open a suppression window on `owner`'s notifier.
///
/// When the returned guard is released, `channel` resumes and, if `signal`
/// is set, a catch-up notification is emitted: the current count for the
/// count channel, a reset for every other channel.
///
/// A fault raised by a flag-property observer while the window opens is
/// reported on the unhandled stream only; it never fails the call.
pub(crate) fn suppress<S: Observed>(
    owner: &Arc<S>,
    channel: NotificationChannel,
    signal: bool,
) -> CollectionResult<SuppressionGuard> {
    owner.notifier().begin_suppression(channel)?;

    let owner = Arc::clone(owner);
    Ok(SuppressionGuard::new(
        channel,
        Box::new(move || {
            let count = owner.observed_count();
            owner.notifier().end_suppression(channel, signal, count)
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObserverError;
    use crate::legacy::{ListChangedKind, translate};
    use crate::scheduler::queued;
    use std::sync::atomic::AtomicUsize;

    type Log = Arc<Mutex<Vec<String>>>;

    fn notifier(threshold: usize) -> Notifier<usize, &'static str> {
        Notifier::new(
            &CollectionConfig::default().with_reset_threshold(threshold),
            Some(translate as Translate<usize, &'static str>),
        )
    }

    struct Recorder {
        log: Log,
        _handles: Vec<crate::subject::SubscriptionHandle>,
    }

    fn record(n: &Notifier<usize, &'static str>) -> Recorder {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        let sink = Arc::clone(&log);
        handles.push(n.changes().unwrap().subscribe(move |e| {
            sink.lock().push(format!("change:{}", e.kind()));
        }));
        let sink = Arc::clone(&log);
        handles.push(n.count_changes().unwrap().subscribe(move |c| {
            sink.lock().push(format!("count:{}", c));
        }));
        let sink = Arc::clone(&log);
        handles.push(n.list_changed().unwrap().subscribe(move |e| {
            sink.lock().push(format!("list:{:?}", e.kind));
        }));

        Recorder {
            log,
            _handles: handles,
        }
    }

    fn entries(recorder: &Recorder) -> Vec<String> {
        recorder.log.lock().clone()
    }

    #[test]
    fn test_single_add_fans_out_in_order() {
        let n = notifier(100);
        let rec = record(&n);

        n.publish(ChangeEvent::added(0, "a"), 1).unwrap();

        assert_eq!(
            entries(&rec),
            vec!["change:item-added", "count:1", "list:ItemAdded"]
        );
    }

    #[test]
    fn test_threshold_of_one_collapses_single_events() {
        let n = notifier(1);
        let rec = record(&n);

        n.publish(ChangeEvent::added(0, "a"), 1).unwrap();

        assert_eq!(entries(&rec), vec!["change:reset", "count:1", "list:Reset"]);
    }

    #[test]
    fn test_batch_collapse_uses_batch_size() {
        let n = notifier(3);
        let rec = record(&n);

        let small: Vec<_> = (0..2).map(|i| (ChangeEvent::added(i, "x"), i + 1)).collect();
        n.publish_batch(small).unwrap();
        assert_eq!(
            entries(&rec)
                .iter()
                .filter(|e| e.starts_with("change:"))
                .count(),
            2
        );

        rec.log.lock().clear();
        let large: Vec<_> = (2..5).map(|i| (ChangeEvent::added(i, "x"), i + 1)).collect();
        n.publish_batch(large).unwrap();
        assert_eq!(entries(&rec), vec!["change:reset", "count:5", "list:Reset"]);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let n = notifier(0);
        let rec = record(&n);
        n.publish_batch(Vec::new()).unwrap();
        assert!(entries(&rec).is_empty());
    }

    #[test]
    fn test_count_is_distinct() {
        let n = notifier(100);
        let rec = record(&n);

        n.publish(ChangeEvent::Reset, 3).unwrap();
        n.publish(ChangeEvent::Reset, 3).unwrap();

        let counts: Vec<_> = entries(&rec)
            .into_iter()
            .filter(|e| e.starts_with("count:"))
            .collect();
        assert_eq!(counts, vec!["count:3"]);
    }

    #[test]
    fn test_item_changed_does_not_touch_count() {
        let n = notifier(100);
        let rec = record(&n);

        n.publish(ChangeEvent::changed(0, "a", "b"), 1).unwrap();
        assert_eq!(entries(&rec), vec!["change:item-changed", "list:ItemChanged"]);
    }

    #[test]
    fn test_channels_filter_independently() {
        let n = notifier(100);
        let rec = record(&n);

        n.begin_suppression(NotificationChannel::ItemChanges).unwrap();
        n.publish(ChangeEvent::changed(0, "a", "b"), 1).unwrap();
        assert!(entries(&rec).is_empty());

        n.publish(ChangeEvent::added(1, "c"), 2).unwrap();
        assert_eq!(
            entries(&rec),
            vec!["change:item-added", "count:2", "list:ItemAdded"]
        );

        rec.log.lock().clear();
        n.begin_suppression(NotificationChannel::CountChanges).unwrap();
        n.publish(ChangeEvent::added(2, "d"), 3).unwrap();
        assert_eq!(entries(&rec), vec!["change:item-added", "list:ItemAdded"]);

        rec.log.lock().clear();
        n.begin_suppression(NotificationChannel::Resets).unwrap();
        n.publish(ChangeEvent::Reset, 3).unwrap();
        assert!(entries(&rec).is_empty());
    }

    #[test]
    fn test_all_changes_gate_silences_everything() {
        let n = notifier(100);
        n.begin_suppression(NotificationChannel::AllChanges).unwrap();

        let rec = record(&n);
        let props = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&props);
        let _props = n.property_changed().unwrap().subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for i in 0..1000 {
            n.publish(ChangeEvent::added(i, "x"), i + 1).unwrap();
        }
        assert!(entries(&rec).is_empty());
        assert_eq!(props.load(Ordering::SeqCst), 0);

        n.end_suppression(NotificationChannel::AllChanges, true, 1000)
            .unwrap();
        assert_eq!(
            entries(&rec),
            vec!["change:reset", "count:1000", "list:Reset"]
        );
    }

    #[test]
    fn test_count_catch_up_signal() {
        let n = notifier(100);
        let rec = record(&n);

        n.begin_suppression(NotificationChannel::CountChanges).unwrap();
        n.publish(ChangeEvent::added(0, "a"), 1).unwrap();
        n.end_suppression(NotificationChannel::CountChanges, true, 1)
            .unwrap();

        assert_eq!(
            entries(&rec),
            vec!["change:item-added", "list:ItemAdded", "count:1"]
        );
    }

    #[test]
    fn test_observer_fault_rethrown_and_reported() {
        let n = notifier(100);
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let _unhandled = n
            .unhandled_errors()
            .subscribe(move |f: &ObserverFault| sink.lock().push(f.stream));
        let _bad = n
            .count_changes()
            .unwrap()
            .try_subscribe(|_| Err(ObserverError::new("bad count")));
        let rec = record(&n);

        let err = n.publish(ChangeEvent::added(0, "a"), 1).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::ObserverFailed(ObserverFault {
                stream: Stream::Count,
                ..
            })
        ));
        assert_eq!(*faults.lock(), vec![Stream::Count]);
        // Every count subscriber saw the value; later streams were skipped.
        assert_eq!(entries(&rec), vec!["change:item-added", "count:1"]);
    }

    #[test]
    fn test_observer_fault_swallowed_when_configured() {
        let n = notifier(100);
        n.set_throw_on_observer_errors(false).unwrap();
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reported);
        let _unhandled = n.unhandled_errors().subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _bad = n
            .changes()
            .unwrap()
            .try_subscribe(|_| Err(ObserverError::new("bad change")));
        let rec = record(&n);

        n.publish(ChangeEvent::added(0, "a"), 1).unwrap();
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        assert_eq!(
            entries(&rec),
            vec!["change:item-added", "count:1", "list:ItemAdded"]
        );
    }

    #[test]
    fn test_queued_scheduler_defers_and_keeps_order() {
        let (scheduler, mut worker) = queued();
        let n: Notifier<usize, &'static str> = Notifier::with_scheduler(
            &CollectionConfig::default(),
            Arc::new(scheduler),
            Some(translate as Translate<usize, &'static str>),
        );
        let _bad = n
            .changes()
            .unwrap()
            .try_subscribe(|_| Err(ObserverError::new("deferred")));
        let rec = record(&n);

        // Faults cannot reach the caller once delivery is deferred.
        n.publish(ChangeEvent::added(0, "a"), 1).unwrap();
        n.publish(ChangeEvent::removed(0, "a"), 0).unwrap();
        assert!(entries(&rec).is_empty());

        worker.run_pending();
        assert_eq!(
            entries(&rec),
            vec![
                "change:item-added",
                "count:1",
                "list:ItemAdded",
                "change:item-removed",
                "count:0",
                "list:ItemDeleted",
            ]
        );
    }

    #[test]
    fn test_threshold_setter_raises_property_changed() {
        let n = notifier(100);
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        let _props = n
            .property_changed()
            .unwrap()
            .subscribe(move |p: &PropertyChanged| sink.lock().push(p.name));

        n.set_reset_threshold(10).unwrap();
        n.set_reset_threshold(10).unwrap();
        assert_eq!(n.reset_threshold(), 10);
        assert_eq!(*names.lock(), vec![PropertyName::ResetThreshold]);
    }

    #[test]
    fn test_publish_after_dispose_fails() {
        let n = notifier(100);
        n.lifecycle().dispose_with(|| n.teardown());
        assert!(matches!(
            n.publish(ChangeEvent::added(0, "a"), 1),
            Err(CollectionError::Disposed)
        ));
        assert!(matches!(n.changes(), Err(CollectionError::Disposed)));
    }

    #[test]
    fn test_publish_while_disposing_is_dropped() {
        let n = notifier(100);
        let rec = record(&n);
        n.lifecycle().dispose_with(|| {
            n.publish(ChangeEvent::added(0, "a"), 1).unwrap();
        });
        assert!(entries(&rec).is_empty());
    }

    #[test]
    fn test_legacy_kind_mapping_reaches_subscribers() {
        let n = notifier(100);
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        let _h = n
            .list_changed()
            .unwrap()
            .subscribe(move |e: &ListChangedEvent| sink.lock().push(e.kind));

        n.publish(ChangeEvent::moved(0, 2, "a"), 3).unwrap();
        assert_eq!(*kinds.lock(), vec![ListChangedKind::ItemMoved]);
    }
}
