// Shared helpers for integration tests.
#![allow(dead_code)]

use observable_collections::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once. Controlled by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records every delivery of a collection as a tagged line, in arrival order.
///
/// Lines look like `change:item-added`, `reset`, `count:3`, `list:ItemAdded`
/// and `prop:Count`.
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
    _handles: Vec<SubscriptionHandle>,
}

impl Recorder {
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count_of(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

fn push(log: &Arc<Mutex<Vec<String>>>, line: String) {
    log.lock().push(line);
}

/// Subscribe to every stream of `list`.
pub fn record_list<T: Clone + Send + Sync + 'static>(list: &ObservableList<T>) -> Recorder {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut handles = record_streams(list, &log);

    let sink = Arc::clone(&log);
    handles.push(
        list.list_changed()
            .unwrap()
            .subscribe(move |e| push(&sink, format!("list:{:?}", e.kind))),
    );

    Recorder {
        log,
        _handles: handles,
    }
}

/// Subscribe to every stream any collection flavor has.
pub fn record<O: Observable>(collection: &O) -> Recorder {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handles = record_streams(collection, &log);
    Recorder {
        log,
        _handles: handles,
    }
}

fn record_streams<O: Observable>(
    collection: &O,
    log: &Arc<Mutex<Vec<String>>>,
) -> Vec<SubscriptionHandle> {
    let mut handles = Vec::new();

    let sink = Arc::clone(log);
    handles.push(
        collection
            .changes()
            .unwrap()
            .subscribe(move |e| push(&sink, format!("change:{}", e.kind()))),
    );
    let sink = Arc::clone(log);
    handles.push(
        collection
            .resets()
            .unwrap()
            .subscribe(move |_| push(&sink, "reset".to_string())),
    );
    let sink = Arc::clone(log);
    handles.push(
        collection
            .count_changes()
            .unwrap()
            .subscribe(move |c| push(&sink, format!("count:{}", c))),
    );
    let sink = Arc::clone(log);
    handles.push(
        collection
            .property_changed()
            .unwrap()
            .subscribe(move |p| push(&sink, format!("prop:{}", p.name))),
    );

    handles
}
