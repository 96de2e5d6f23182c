//! Bounded worker pool: a fixed number of tasks draining one queue of
//! submitted batches, each running through the shared [`Orchestrator`].
//!
//! N worker tasks race to `recv()` from one shared, mutex-guarded channel
//! — the standard multi-consumer extension of `tokio::sync::mpsc`. `submit`
//! backpressures on a full queue (awaits a free slot) rather than
//! rejecting, since a chat turn enqueuing its own extraction work should
//! wait its turn rather than be told to retry later.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::orchestrator::{BatchInput, BatchResult, Orchestrator};

struct Job {
    batch: BatchInput,
    reply: oneshot::Sender<BatchResult>,
}

/// A handle to a running pool. Dropping it closes the submission channel;
/// in-flight jobs still complete, but `submit` after that point errs.
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `pool_size` worker tasks sharing `orchestrator`, draining a
    /// channel bounded at `queue_capacity`.
    pub fn spawn(orchestrator: Arc<Orchestrator>, pool_size: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..pool_size.max(1))
            .map(|worker_id| {
                let orchestrator = Arc::clone(&orchestrator);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let job = {
                            let mut receiver = receiver.lock().await;
                            receiver.recv().await
                        };
                        let Some(Job { batch, reply }) = job else {
                            tracing::info!(worker_id, "worker pool channel closed, shutting down");
                            break;
                        };
                        let result = orchestrator.run(batch).await;
                        let _ = reply.send(result);
                    }
                })
            })
            .collect();

        Self { sender, workers }
    }

    /// Enqueues `batch` and awaits its result. Backpressures (awaits a free
    /// slot) rather than rejecting when the queue is full; returns an error
    /// only if the pool has been shut down.
    pub async fn submit(&self, batch: BatchInput) -> Result<BatchResult, WorkerPoolClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender.send(Job { batch, reply: reply_tx }).await.map_err(|_| WorkerPoolClosed)?;
        reply_rx.await.map_err(|_| WorkerPoolClosed)
    }

    /// Closes the submission channel and awaits every worker task to drain
    /// in-flight jobs before returning.
    pub async fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolClosed;

impl std::fmt::Display for WorkerPoolClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker pool has been shut down")
    }
}

impl std::error::Error for WorkerPoolClosed {}
