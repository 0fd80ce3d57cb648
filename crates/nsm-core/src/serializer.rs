//! Per-connection-id serializer (`spec.md` §4.B): guarantees at-most-one
//! in-flight operation per connection id while letting different ids run
//! fully concurrently.
//!
//! Grounded on the Go SDK's `pkg/tools/serialize` (a process-wide executor
//! keyed by a `sync.Map`), rebuilt around [`dashmap::DashMap`] — the generic
//! concurrent map primitive Design Notes §9 asks for in place of
//! code-generated per-type map wrappers — with one background task per id
//! draining a private queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::connection::SegmentId;
use crate::contract::Cancellation;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

struct PendingJob {
    cancellation: Cancellation,
    fut: Job,
}

struct QueueState {
    sender: mpsc::UnboundedSender<PendingJob>,
    pending: Arc<AtomicUsize>,
}

/// Runs closures submitted under the same id strictly in FIFO submission
/// order, one at a time; closures under different ids may run concurrently.
/// An id with no outstanding work has its queue and worker task torn down —
/// there is no per-connection memory held once the connection goes quiet.
pub struct Serializer {
    queues: Arc<DashMap<SegmentId, QueueState>>,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            queues: Arc::new(DashMap::new()),
        }
    }

    /// Enqueues `job` to run once every earlier submission for `id` has
    /// completed. `job` receives its own [`Cancellation`] so it can check
    /// for advisory cancellation mid-execution; if `cancellation` is
    /// already cancelled by the time the job would start, it is skipped
    /// entirely rather than run.
    pub fn submit<F, Fut>(&self, id: SegmentId, cancellation: Cancellation, job: F)
    where
        F: FnOnce(Cancellation) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let fut: Job = Box::pin(job(cancellation.clone()));
        let pending_job = PendingJob { cancellation, fut };

        let queues = self.queues.clone();
        let mut entry = self.queues.entry(id).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            let pending = Arc::new(AtomicUsize::new(0));
            tokio::spawn(Self::run_worker(id, rx, pending.clone(), queues.clone()));
            QueueState { sender: tx, pending }
        });
        entry.pending.fetch_add(1, Ordering::SeqCst);
        // An unbounded channel's send only fails if the receiver dropped,
        // which only happens after the worker observes an empty queue and
        // removes itself from `queues` under the same shard lock this
        // `entry()` call holds — so a successful lookup here always pairs
        // with a live receiver.
        let _ = entry.sender.send(pending_job);
    }

    async fn run_worker(
        id: SegmentId,
        mut rx: mpsc::UnboundedReceiver<PendingJob>,
        pending: Arc<AtomicUsize>,
        queues: Arc<DashMap<SegmentId, QueueState>>,
    ) {
        while let Some(job) = rx.recv().await {
            if !job.cancellation.is_cancelled() {
                job.fut.await;
            }
            if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                let retired = queues.remove_if(&id, |_, state| Arc::ptr_eq(&state.pending, &pending));
                if retired.is_some() {
                    return;
                }
                // A concurrent submit incremented `pending` again between our
                // decrement and the removal attempt; keep draining.
            }
        }
    }

    /// Number of ids currently holding live queues, for diagnostics/tests.
    pub fn active_ids(&self) -> usize {
        self.queues.len()
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}
