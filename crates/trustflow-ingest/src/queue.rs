//! C6 — Work Queue: a bounded channel of refresh instructions feeding a
//! fixed-size worker pool (spec.md §4.6).
//!
//! Grounded on `queue.go`'s `Enqueue`/`Start`: non-blocking `try_send`
//! that drops-and-logs on a full queue (webhooks must never feel
//! backpressure), a fixed pool of workers each pulling from the same
//! channel, and per-message panic recovery so one bad invocation doesn't
//! take a worker offline. Shutdown is cooperative: a `tokio::sync::watch`
//! channel plays the role of the teacher's single shared cancellation
//! signal, observed by every worker loop and by `trustflow-anchor`'s tick
//! loop.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, warn};

use trustflow_types::RefreshInstruction;

use crate::provider::{ProviderClient, TokenProvider};
use crate::worker::IngestWorker;

pub const DEFAULT_QUEUE_SIZE: usize = 1024;
pub const DEFAULT_WORKERS: usize = 4;

/// The producer side of the queue: cheap to clone, safe to hand to the
/// webhook front door (C7) and to the workers themselves (for
/// continuation re-enqueue).
#[derive(Clone)]
pub struct WorkQueueHandle {
    tx: mpsc::Sender<RefreshInstruction>,
}

impl WorkQueueHandle {
    /// Creates the bounded channel, returning the producer handle (clone
    /// freely: into C7, into C5 for continuation re-enqueue) and the
    /// single receiver `spawn_pool` distributes across its workers.
    pub fn channel(capacity: usize) -> (WorkQueueHandle, mpsc::Receiver<RefreshInstruction>) {
        let (tx, rx) = mpsc::channel(capacity);
        (WorkQueueHandle { tx }, rx)
    }

    /// Never blocks. Drops the instruction with a log line if the queue
    /// is full (spec.md §7 `QueueFull`: "log-and-drop; webhook still ACKs
    /// the provider").
    pub fn try_enqueue(&self, instr: RefreshInstruction) {
        if let Err(err) = self.tx.try_send(instr) {
            match err {
                mpsc::error::TrySendError::Full(instr) => warn!(
                    scope = %instr.scope,
                    delivery_id = %instr.delivery_id,
                    "work queue full; dropping refresh instruction"
                ),
                mpsc::error::TrySendError::Closed(instr) => warn!(
                    scope = %instr.scope,
                    delivery_id = %instr.delivery_id,
                    "work queue closed; dropping refresh instruction"
                ),
            }
        }
    }
}

/// Spawns `workers` tasks sharing `rx` (the receiver half of a channel
/// obtained from `WorkQueueHandle::channel`), each running
/// `worker.run(instr)` per message. Every worker exits once `shutdown`
/// observes `true` and the channel has drained — `worker` must already
/// hold a clone of this same channel's producer handle if it needs to
/// enqueue continuations (spec.md §4.5 step e).
pub fn spawn_pool<P, T>(
    workers: usize,
    rx: mpsc::Receiver<RefreshInstruction>,
    worker: Arc<IngestWorker<P, T>>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    P: ProviderClient + 'static,
    T: TokenProvider + 'static,
{
    let rx = Arc::new(tokio::sync::Mutex::new(rx));

    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let worker = Arc::clone(&worker);
        let rx = Arc::clone(&rx);
        let mut shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let instr = tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    instr = async { rx.lock().await.recv().await } => instr,
                };
                let Some(instr) = instr else { break };
                run_one(id, &worker, instr).await;
            }
        }));
    }

    handles
}

/// Runs one instruction through the worker inside its own task so a panic
/// inside `run` (e.g. a normalization bug on malformed provider data)
/// logs and is dropped instead of killing this worker's loop — the
/// `recover()`-per-message behavior of `queue.go`'s `safeConsume`.
async fn run_one<P, T>(worker_id: usize, worker: &Arc<IngestWorker<P, T>>, instr: RefreshInstruction)
where
    P: ProviderClient + 'static,
    T: TokenProvider + 'static,
{
    let worker = Arc::clone(worker);
    let scope = instr.scope.clone();
    let delivery_id = instr.delivery_id.clone();
    let result = tokio::spawn(async move { worker.run(instr).await }).await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(worker_id, %scope, delivery_id = %delivery_id, error = %err, "ingest invocation failed");
        }
        Err(join_err) => {
            error!(worker_id, %scope, delivery_id = %delivery_id, error = %join_err, "ingest invocation panicked");
        }
    }
}
