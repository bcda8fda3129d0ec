/// Delivery schedulers.
///
/// Every notification a collection emits is handed to a [`Scheduler`] as a
/// boxed task. Two implementations are provided:
///
/// - [`ImmediateScheduler`] runs the task inline on the mutating thread.
///   This is the default and the only mode in which subscriber faults can be
///   returned to the caller.
/// - [`QueuedScheduler`] appends the task to a FIFO queue drained by a
///   [`QueueWorker`], either synchronously with [`QueueWorker::run_pending`]
///   or on an async runtime with [`QueueWorker::run`].
///
/// The collections never spawn threads or tasks themselves.
use std::fmt;
use tokio::sync::mpsc;
use tracing::trace;

/// A unit of scheduled delivery work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Executes delivery tasks.
///
/// Implementations must run tasks in the order they were scheduled.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Run or enqueue `task`.
    fn schedule(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, task: Task) {
        task();
    }
}

/// Enqueues tasks for a [`QueueWorker`].
#[derive(Clone)]
pub struct QueuedScheduler {
    sender: mpsc::UnboundedSender<Task>,
}

impl fmt::Debug for QueuedScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedScheduler")
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl Scheduler for QueuedScheduler {
    fn schedule(&self, task: Task) {
        if self.sender.send(task).is_err() {
            trace!("Queue worker dropped, discarding scheduled delivery");
        }
    }
}

/// Drains the queue fed by a [`QueuedScheduler`].
pub struct QueueWorker {
    receiver: mpsc::UnboundedReceiver<Task>,
}

impl fmt::Debug for QueueWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueWorker").finish_non_exhaustive()
    }
}

impl QueueWorker {
    /// Run every task queued so far and return how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks until every scheduler handle has been dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.receiver.recv().await {
            task();
        }
    }
}

/// Create a queued scheduler and the worker that drains it.
pub fn queued() -> (QueuedScheduler, QueueWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (QueuedScheduler { sender }, QueueWorker { receiver })
}
