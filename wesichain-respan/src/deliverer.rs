use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

use crate::{Delivery, FlushError, IngestClient, IngestError, LogPayload};

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub batches_sent: u64,
    pub batches_rejected: u64,
    pub batches_failed: u64,
    /// Batches never handed to the worker because the queue was full or closed.
    pub dropped_batches: u64,
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    sent: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Hands batches to a single background worker without waiting on the network.
///
/// The worker lives on its own thread with a current-thread runtime, so
/// submitting works from synchronous and asynchronous callers alike. It stops
/// once every `Deliverer` clone is dropped and never holds up process exit.
#[derive(Clone)]
pub struct Deliverer {
    sender: Sender<Vec<LogPayload>>,
    counters: Arc<Counters>,
}

impl Deliverer {
    pub fn spawn(client: IngestClient, queue_capacity: usize) -> Result<Self, IngestError> {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker_counters = counters.clone();
        thread::Builder::new()
            .name("respan-deliverer".to_string())
            .spawn(move || run_worker(client, receiver, worker_counters))
            .map_err(IngestError::Worker)?;
        Ok(Self { sender, counters })
    }

    /// Queue a batch for delivery. Never blocks; a full queue drops the batch.
    pub fn submit(&self, batch: Vec<LogPayload>) {
        if batch.is_empty() {
            return;
        }
        let payloads = batch.len();
        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.sender.try_send(batch) {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            match err {
                TrySendError::Full(_) => {
                    tracing::warn!(payloads, "respan delivery queue full, dropping batch")
                }
                TrySendError::Closed(_) => {
                    tracing::warn!(payloads, "respan delivery worker stopped, dropping batch")
                }
            }
        }
    }

    /// Batches submitted but not yet fully processed by the worker.
    pub fn pending_len(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            batches_sent: self.counters.sent.load(Ordering::Relaxed),
            batches_rejected: self.counters.rejected.load(Ordering::Relaxed),
            batches_failed: self.counters.failed.load(Ordering::Relaxed),
            dropped_batches: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Wait until every submitted batch has been delivered, rejected, or
    /// given up on.
    pub async fn flush(&self, timeout: Duration) -> Result<DeliveryStats, FlushError> {
        let start = Instant::now();
        loop {
            let pending = self.pending_len();
            if pending == 0 {
                return Ok(self.stats());
            }
            if start.elapsed() >= timeout {
                return Err(FlushError::Timeout {
                    waited: start.elapsed(),
                    pending,
                });
            }
            tokio::time::sleep(FLUSH_POLL_INTERVAL).await;
        }
    }
}

fn run_worker(client: IngestClient, mut receiver: Receiver<Vec<LogPayload>>, counters: Arc<Counters>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start respan delivery runtime");
            receiver.close();
            while receiver.try_recv().is_ok() {
                counters.pending.fetch_sub(1, Ordering::SeqCst);
                counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }
    };

    runtime.block_on(async move {
        while let Some(batch) = receiver.recv().await {
            match client.send_batch(&batch).await {
                Ok(Delivery::Accepted { attempts }) => {
                    counters.sent.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(payloads = batch.len(), attempts, "respan batch delivered");
                }
                Ok(Delivery::Rejected { .. }) => {
                    counters.rejected.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        payloads = batch.len(),
                        endpoint = client.endpoint(),
                        error = %err,
                        "respan ingest failed after retries, dropping batch"
                    );
                }
            }
            counters.pending.fetch_sub(1, Ordering::SeqCst);
        }
    });
}
