use super::{Document, DocumentWriter, WriteOutcome};
use crate::config::PersistenceConfig;
use crate::database::DocumentStore;

use futures::StreamExt;
use itertools::Itertools;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

type SaveRequest = Arc<dyn Document>;

/// Background saving of changed documents.
///
/// A single consumer task takes save requests off a bounded queue and groups them into batches that close after
/// `batch_size` requests or `batch_window` after the first one, whichever comes first. Each batch keeps only the latest
/// request per document, then writes them with at most `max_concurrent_writes` in flight. A failed write is logged and
/// does not stop the rest of the batch.
pub struct PersistencePipeline {
    requester: SaveRequester,
    cancel: watch::Sender<bool>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    config: PersistenceConfig,
}

/// A cheap handle for requesting saves. Never blocks the calling thread on a full queue.
#[derive(Clone)]
pub struct SaveRequester {
    sender: mpsc::Sender<SaveRequest>,
    accepting: Arc<AtomicBool>,
    overflow: Arc<Overflow>,
    writer: Arc<DocumentWriter>,
    runtime: Handle,
}

/// Counts the requests that found the queue full and are waiting for room on their own task.
#[derive(Default)]
struct Overflow {
    pending: AtomicUsize,
    drained: Notify,
}

impl Overflow {
    fn enter(self: &Arc<Self>) -> OverflowGuard {
        self.pending.fetch_add(1, Ordering::SeqCst);
        OverflowGuard(Arc::clone(self))
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        loop {
            // Registered before the check so a wakeup in between is not missed.
            let drained = self.drained.notified();
            if self.pending() == 0 {
                return;
            }
            drained.await;
        }
    }
}

struct OverflowGuard(Arc<Overflow>);

impl Drop for OverflowGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.drained.notify_waiters();
        }
    }
}

impl PersistencePipeline {
    /// Spawns the consumer task on `runtime`.
    pub fn start(
        runtime: &Handle,
        store: Arc<dyn DocumentStore>,
        config: PersistenceConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (cancel, cancelled) = watch::channel(false);
        let writer = Arc::new(DocumentWriter::new(store, &config));
        let consumer = runtime.spawn(run_consumer(receiver, cancelled, writer.clone(), config));
        Self {
            requester: SaveRequester {
                sender,
                accepting: Arc::new(AtomicBool::new(true)),
                overflow: Arc::default(),
                writer,
                runtime: runtime.clone(),
            },
            cancel,
            consumer: Mutex::new(Some(consumer)),
            config,
        }
    }

    pub fn requester(&self) -> SaveRequester {
        self.requester.clone()
    }

    pub fn writer(&self) -> &Arc<DocumentWriter> {
        &self.requester.writer
    }

    pub fn request_save(&self, document: Arc<dyn Document>) {
        self.requester.request_save(document)
    }

    /// Stops accepting requests, flushes everything already queued and waits up to the shutdown timeout for the
    /// consumer and for requests still waiting on a full queue. Requests made afterwards are saved immediately on the
    /// caller's thread.
    pub async fn shutdown(&self) {
        self.requester.accepting.store(false, Ordering::SeqCst);
        // The consumer may already be gone.
        let _ = self.cancel.send(true);
        let deadline = Instant::now() + self.config.shutdown_timeout();

        let consumer = self.consumer.lock().take();
        if let Some(consumer) = consumer {
            match tokio::time::timeout_at(deadline, consumer).await {
                Ok(Ok(())) => log::info!("Persistence pipeline shut down"),
                Ok(Err(e)) => log::error!("Persistence consumer failed: {}", e),
                Err(_) => log::warn!(
                    "Persistence pipeline did not finish within {:?}; some saves may be lost",
                    self.config.shutdown_timeout()
                ),
            }
        }

        // Once the consumer is gone their sends fail and they fall back to saving directly.
        let overflow = &self.requester.overflow;
        if overflow.pending() > 0 {
            log::debug!("Waiting for {} overflowing save requests", overflow.pending());
            if tokio::time::timeout_at(deadline, overflow.wait()).await.is_err() {
                log::warn!(
                    "{} overflowing save requests were still pending at shutdown",
                    overflow.pending()
                );
            }
        }
    }

    /// [`Self::shutdown`] for callers outside of the runtime.
    pub fn shutdown_blocking(&self) {
        self.requester.runtime.clone().block_on(self.shutdown())
    }

    pub fn is_running(&self) -> bool {
        self.consumer.lock().is_some()
    }
}

impl Drop for PersistencePipeline {
    fn drop(&mut self) {
        if self.is_running() {
            log::warn!("Persistence pipeline dropped without shutdown");
            self.requester.accepting.store(false, Ordering::SeqCst);
            let _ = self.cancel.send(true);
        }
    }
}

impl SaveRequester {
    pub fn request_save(&self, document: Arc<dyn Document>) {
        if !self.accepting.load(Ordering::SeqCst) {
            self.fallback_save(document.as_ref(), "pipeline is shut down");
            return;
        }
        match self.sender.try_send(document) {
            Ok(()) => {}
            Err(TrySendError::Full(document)) => {
                log::debug!("Save queue is full, waiting for room in the background");
                let requester = self.clone();
                let guard = self.overflow.enter();
                self.runtime.spawn(async move {
                    let _guard = guard;
                    if let Err(e) = requester.sender.send(document).await {
                        let document = e.0;
                        let writer = requester.writer.clone();
                        let _ = tokio::task::spawn_blocking(move || {
                            fallback_save(&writer, document.as_ref(), "save queue closed")
                        })
                        .await;
                    }
                });
            }
            Err(TrySendError::Closed(document)) => {
                self.fallback_save(document.as_ref(), "save queue closed")
            }
        }
    }

    fn fallback_save(&self, document: &dyn Document, reason: &str) {
        fallback_save(&self.writer, document, reason)
    }
}

fn fallback_save(writer: &DocumentWriter, document: &dyn Document, reason: &str) {
    log::info!("Saving {} immediately: {}", document.id(), reason);
    if let Err(e) = writer.persist(document) {
        log::error!("Fallback save of {} failed: {}", document.id(), e);
    }
}

async fn run_consumer(
    mut receiver: mpsc::Receiver<SaveRequest>,
    mut cancelled: watch::Receiver<bool>,
    writer: Arc<DocumentWriter>,
    config: PersistenceConfig,
) {
    let batch_size = config.batch_size.max(1);
    'consume: loop {
        let first = tokio::select! {
            biased;
            _ = cancelled.changed() => break 'consume,
            request = receiver.recv() => match request {
                Some(request) => request,
                None => break 'consume,
            },
        };

        let mut batch = vec![first];
        let window = tokio::time::sleep(config.batch_window());
        tokio::pin!(window);
        let mut stop = false;
        while batch.len() < batch_size {
            tokio::select! {
                request = receiver.recv() => match request {
                    Some(request) => batch.push(request),
                    None => { stop = true; break; }
                },
                _ = &mut window => break,
                _ = cancelled.changed() => { stop = true; break; }
            }
        }
        flush_batch(&writer, batch, &config).await;
        if stop {
            break;
        }
    }

    // Anything that made it into the queue before it closed still gets written.
    receiver.close();
    let mut pending = Vec::new();
    while let Some(request) = receiver.recv().await {
        pending.push(request);
    }
    if !pending.is_empty() {
        log::info!("Flushing {} pending save requests", pending.len());
        flush_batch(&writer, pending, &config).await;
    }
}

async fn flush_batch(
    writer: &Arc<DocumentWriter>,
    batch: Vec<SaveRequest>,
    config: &PersistenceConfig,
) {
    let requested = batch.len();
    let unique: Vec<_> = batch
        .into_iter()
        .rev()
        .unique_by(|document| document.id().clone())
        .collect();
    log::debug!(
        "Persisting {} documents ({} requests)",
        unique.len(),
        requested
    );

    futures::stream::iter(unique)
        .for_each_concurrent(config.max_concurrent_writes.max(1), |document| async move {
            match writer.persist_with_retry(document.clone()).await {
                Ok(WriteOutcome::Written { revision }) => {
                    log::debug!("Saved {} at revision {}", document.id(), revision)
                }
                Ok(WriteOutcome::Superseded) => {}
                Err(e) => log::error!("Failed to save {}: {}", document.id(), e),
            }
        })
        .await;
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
