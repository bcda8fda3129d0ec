/// Falsification tests for the observable collections.
///
/// These tests try to break the notification engine rather than confirm it:
///
/// - Concurrent disposal racing itself and in-flight mutations
/// - Concurrent suppression of the same channel
/// - Concurrent mutation from many threads
/// - Subscribers that re-enter the collection or unsubscribe themselves
/// - Deferred delivery on a queued scheduler
///
/// Philosophy: If we can't break it, we gain confidence it's correct.
mod common;

use common::init_tracing;
use observable_collections::prelude::*;
use observable_collections::QueuedScheduler;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;

// ============================================================================
// SECTION 1: DISPOSAL
// ============================================================================

/// Falsification: can two threads both run the teardown?
#[test]
fn falsify_concurrent_dispose_runs_teardown_once() {
    init_tracing();
    for _ in 0..50 {
        let list = ObservableList::from_vec((0..10).collect::<Vec<i32>>());
        let resets = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resets);
        let _h = list.resets().unwrap().subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let list = list.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    list.dispose();
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("dispose must not panic");
        }

        assert_eq!(resets.load(Ordering::SeqCst), 1, "teardown ran more than once");
        assert!(list.is_disposed());
    }
}

/// Falsification: can a mutation racing disposal fail with anything other
/// than a lifecycle fault, or leave the collection half torn down?
#[test]
fn falsify_mutations_racing_dispose() {
    for _ in 0..20 {
        let list = ObservableList::<usize>::new();
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let writers: Vec<_> = (0..THREADS)
            .map(|t| {
                let list = list.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..100 {
                        match list.add(t * 100 + i) {
                            Ok(()) => {}
                            Err(e) => {
                                assert!(e.is_lifecycle(), "unexpected error: {e}");
                                return;
                            }
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        list.dispose();

        for writer in writers {
            writer.join().expect("writer panicked");
        }
        assert!(list.is_disposed());
        assert!(matches!(list.len(), Err(CollectionError::Disposed)));
        let rendered = format!("{list:?}");
        assert!(
            rendered.starts_with("ObservableList { len: 0,"),
            "disposed list kept items: {rendered}"
        );
    }
}

// ============================================================================
// SECTION 2: SUPPRESSION RACES
// ============================================================================

/// Falsification: can two threads both win the same suppression?
#[test]
fn falsify_concurrent_suppression_has_one_winner() {
    for channel in NotificationChannel::ALL {
        let list = ObservableList::<i32>::new();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let list = list.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    list.suppress(channel, false)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("suppress must not panic"))
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "{channel} suppression had {winners} winners");
        assert!(results.iter().all(|r| match r {
            Ok(_) => true,
            Err(e) => matches!(e, CollectionError::AlreadySuppressed { .. }),
        }));

        drop(results);
        assert!(list.is_tracking(channel).unwrap());
    }
}

/// Falsification: can writers on other threads leak events through an
/// all-changes suppression window?
#[test]
fn falsify_suppression_window_under_concurrent_writes() {
    let list = ObservableList::<usize>::new();
    let events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&events);
    let _h = list.changes().unwrap().subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let guard = list.suppress_change_notifications(true).unwrap();
    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let list = list.clone();
            thread::spawn(move || {
                for i in 0..250 {
                    list.add(t * 1000 + i).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer panicked");
    }

    assert_eq!(events.load(Ordering::SeqCst), 0);
    guard.finish().unwrap();
    assert_eq!(events.load(Ordering::SeqCst), 1);
    assert_eq!(list.len().unwrap(), THREADS * 250);
}

// ============================================================================
// SECTION 3: CONCURRENT MUTATION
// ============================================================================

/// Falsification: can concurrent adds lose items or events?
#[test]
fn falsify_concurrent_adds_deliver_every_event() {
    let bag = ObservableCollection::<usize>::new();
    let added = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&added);
    let _h = bag.changes().unwrap().subscribe(move |e| {
        if let ChangeEvent::ItemAdded { value, .. } = e {
            sink.lock().push(*value);
        }
    });

    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let bag = bag.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    bag.add(t * 100 + i).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer panicked");
    }

    let mut seen = added.lock().clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..THREADS * 100).collect::<Vec<_>>());
    assert_eq!(bag.len().unwrap(), THREADS * 100);
}

/// Falsification: can concurrent dictionary batches double-insert a key?
#[test]
fn falsify_concurrent_try_add_range_inserts_each_key_once() {
    let dict = ObservableDictionary::<u32, usize>::new();
    let added = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&added);
    let _h = dict.changes().unwrap().subscribe(move |e| {
        if matches!(e, ChangeEvent::ItemAdded { .. }) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dict = dict.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dict.try_add_range((0..50u32).map(|k| (k, t))).unwrap().len()
            })
        })
        .collect();

    let failed: usize = handles
        .into_iter()
        .map(|h| h.join().expect("batch panicked"))
        .sum();

    assert_eq!(dict.len().unwrap(), 50);
    assert_eq!(failed, THREADS * 50 - 50);
    assert_eq!(added.load(Ordering::SeqCst), 50);
}

// ============================================================================
// SECTION 4: HOSTILE SUBSCRIBERS
// ============================================================================

/// Falsification: does a subscriber that mutates the collection deadlock?
#[test]
fn falsify_reentrant_subscriber() {
    let list = ObservableList::<usize>::new();
    let inner = list.clone();
    let _h = list.changes().unwrap().subscribe(move |e| {
        if let ChangeEvent::ItemAdded { value, .. } = e {
            if *value < 5 {
                inner.add(value + 1).unwrap();
            }
        }
    });

    list.add(0).unwrap();
    assert_eq!(list.to_vec().unwrap(), vec![0, 1, 2, 3, 4, 5]);
}

/// Falsification: does a subscriber that unsubscribes itself break delivery
/// to the others?
#[test]
fn falsify_self_unsubscribing_subscriber() {
    let list = ObservableList::<i32>::new();
    let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));
    let own = Arc::clone(&slot);
    let once = Arc::new(AtomicUsize::new(0));
    let once_counter = Arc::clone(&once);
    *slot.lock() = Some(list.changes().unwrap().subscribe(move |_| {
        once_counter.fetch_add(1, Ordering::SeqCst);
        own.lock().take();
    }));

    let others = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&others);
    let _other = list.changes().unwrap().subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    list.add(1).unwrap();
    list.add(2).unwrap();

    assert_eq!(once.load(Ordering::SeqCst), 1);
    assert_eq!(others.load(Ordering::SeqCst), 2);
}

/// Falsification: can a subscriber that disposes the collection mid-fan-out
/// make the publisher fail?
#[test]
fn falsify_subscriber_disposing_collection() {
    let list = ObservableList::<i32>::new();
    let inner = list.clone();
    let _h = list.changes().unwrap().subscribe(move |e| {
        if !e.is_reset() {
            inner.dispose();
        }
    });

    assert!(list.add(1).is_ok());
    assert!(list.is_disposed());
}

/// Falsification: can a batch whose input iterator reads the dictionary
/// deadlock on the storage lock?
#[test]
fn falsify_batch_iterator_reading_dictionary() {
    let dict = ObservableDictionary::<&'static str, i32>::new();
    dict.add("a", 1).unwrap();

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let worker = dict.clone();
    thread::spawn(move || {
        let reader = worker.clone();
        let bumped = worker.add_or_update_range(
            ["a", "b"]
                .into_iter()
                .map(move |k| (k, reader.get(&k).unwrap().unwrap_or(0) + 1)),
        );
        let reader = worker.clone();
        let removed = worker.try_remove_range(
            ["a", "b"]
                .into_iter()
                .filter(move |k| reader.contains_key(k).unwrap()),
        );
        let _ = done_tx.send((bumped, removed));
    });

    let (bumped, removed) = done_rx
        .recv_timeout(Duration::from_secs(3))
        .expect("batch deadlocked on its own input iterator");
    assert!(bumped.is_ok());
    assert_eq!(removed.unwrap(), Vec::<&str>::new());
    assert!(dict.is_empty().unwrap());
}

/// Falsification: can disposal racing an item-tracking batch leave
/// listeners attached to items of a torn-down collection?
#[test]
fn falsify_tracking_listeners_survive_dispose_race() {
    #[derive(Clone)]
    struct Tracked(Subject<PropertyChanged>);

    impl NotifyPropertyChanged for Tracked {
        fn property_changed(&self) -> &Subject<PropertyChanged> {
            &self.0
        }
    }

    for _ in 0..20 {
        let list = ObservableList::with_item_tracking(CollectionConfig::default(), Vec::new());
        let items: Vec<Tracked> = (0..THREADS * 20).map(|_| Tracked(Subject::new())).collect();
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let writers: Vec<_> = items
            .chunks(20)
            .map(|chunk| {
                let list = list.clone();
                let chunk = chunk.to_vec();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for item in chunk {
                        if list.add(item).is_err() {
                            return;
                        }
                    }
                })
            })
            .collect();

        barrier.wait();
        list.dispose();
        for writer in writers {
            writer.join().expect("writer panicked");
        }

        let attached = items.iter().filter(|it| it.0.observer_count() > 0).count();
        assert_eq!(attached, 0, "{attached} listeners leaked past dispose");
    }
}

// ============================================================================
// SECTION 5: DEFERRED DELIVERY
// ============================================================================

/// Falsification: does a queued scheduler reorder notifications?
#[tokio::test]
async fn falsify_queued_delivery_keeps_program_order() {
    let (scheduler, worker) = queued();
    let list = ObservableList::with_scheduler(CollectionConfig::default(), Arc::new(scheduler));
    let (_h, mut rx) = list.changes().unwrap().receiver();

    let pump = tokio::spawn(worker.run());
    for i in 0..20 {
        list.add(i).unwrap();
    }
    list.move_item(0, 19).unwrap();
    list.dispose();
    drop(list);

    let mut received = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        received.push(event);
        if received.last() == Some(&ChangeEvent::Reset) {
            break;
        }
    }

    let expected: Vec<_> = (0..20)
        .map(|i| ChangeEvent::added(i as usize, i))
        .chain([ChangeEvent::moved(0, 19, 0), ChangeEvent::Reset])
        .collect();
    assert_eq!(received, expected);
    pump.abort();
}

/// Falsification: can a deferred subscriber fault reach the publisher?
#[test]
fn falsify_deferred_fault_never_returned() {
    let (scheduler, mut worker): (QueuedScheduler, _) = queued();
    let list = ObservableList::with_scheduler(CollectionConfig::default(), Arc::new(scheduler));
    let faults = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&faults);
    let _unhandled = list.unhandled_errors().subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let _bad = list
        .changes()
        .unwrap()
        .try_subscribe(|_| Err(ObserverError::new("late")));

    assert!(list.add(1).is_ok());
    assert_eq!(faults.load(Ordering::SeqCst), 0);

    worker.run_pending();
    assert_eq!(faults.load(Ordering::SeqCst), 1);
}

/// Falsification: do async receivers see the same stream as callbacks?
#[tokio::test]
async fn falsify_async_receiver_matches_callbacks() {
    let dict = ObservableDictionary::<&'static str, i32>::new();
    let (_h, mut rx) = dict.count_changes().unwrap().receiver();

    dict.add("a", 1).unwrap();
    dict.add("b", 2).unwrap();
    dict.remove(&"a").unwrap();

    let mut counts = Vec::new();
    for _ in 0..3 {
        counts.push(rx.recv().await.expect("count stream closed early"));
    }
    assert_eq!(counts, vec![1, 2, 1]);
}
