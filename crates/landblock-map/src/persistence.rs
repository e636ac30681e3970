mod pipeline;
mod registry;

pub use pipeline::*;
pub use registry::*;

use crate::config::PersistenceConfig;
use crate::database::{DocumentId, DocumentStore};
use crate::error::{ProjectionError, StoreError};

use landblock_core::SmallKeyHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Anything the persistence pipeline can save.
pub trait Document: Send + Sync + 'static {
    fn id(&self) -> &DocumentId;

    /// Stored alongside the projection when the document is first created.
    fn kind(&self) -> &'static str;

    /// Bumped by every mutation.
    fn revision(&self) -> u64;

    /// Serializes the current state. The returned revision must describe exactly those bytes.
    fn save_projection(&self) -> Result<Projection, ProjectionError>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Projection {
    pub revision: u64,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteOutcome {
    Written { revision: u64 },
    /// An equal or newer revision was already written.
    Superseded,
}

/// Writes document projections to a [`DocumentStore`].
///
/// Writes of the same document are serialized by a per-document gate that remembers the last revision written, so a
/// stale projection never overwrites a newer one no matter which path (batch or fallback) gets there first.
pub struct DocumentWriter {
    store: Arc<dyn DocumentStore>,
    gates: Mutex<SmallKeyHashMap<DocumentId, Arc<Mutex<Option<u64>>>>>,
    attempts: u32,
    backoff: Duration,
}

impl DocumentWriter {
    pub fn new(store: Arc<dyn DocumentStore>, config: &PersistenceConfig) -> Self {
        Self {
            store,
            gates: Default::default(),
            attempts: config.write_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn last_written(&self, id: &DocumentId) -> Option<u64> {
        self.gates.lock().get(id).and_then(|gate| *gate.lock())
    }

    /// Blocking write of the document's current projection. Creates the document if the store has never seen it.
    pub fn persist(&self, document: &dyn Document) -> Result<WriteOutcome, StoreError> {
        let gate = self
            .gates
            .lock()
            .entry(document.id().clone())
            .or_default()
            .clone();
        let mut last_written = gate.lock();

        let projection = document.save_projection()?;
        if matches!(*last_written, Some(last) if projection.revision <= last) {
            return Ok(WriteOutcome::Superseded);
        }

        let id = document.id();
        match self.store.update(id, &projection.bytes) {
            Err(StoreError::NotFound(_)) => {
                self.store.create(id, document.kind(), &projection.bytes)?
            }
            result => result?,
        }
        *last_written = Some(projection.revision);
        log::trace!("Wrote {} at revision {}", id, projection.revision);
        Ok(WriteOutcome::Written {
            revision: projection.revision,
        })
    }

    /// [`Self::persist`] on the blocking pool, retrying transient failures with exponential backoff.
    pub async fn persist_with_retry(
        self: &Arc<Self>,
        document: Arc<dyn Document>,
    ) -> Result<WriteOutcome, StoreError> {
        let mut attempt = 1;
        loop {
            let writer = Arc::clone(self);
            let doc = Arc::clone(&document);
            let result = tokio::task::spawn_blocking(move || writer.persist(&*doc))
                .await
                .map_err(|e| StoreError::Unavailable(format!("write task failed: {}", e)))?;
            match result {
                Err(e) if e.is_retryable() && attempt < self.attempts => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt - 1);
                    log::warn!(
                        "Writing {} failed (attempt {}/{}), retrying in {:?}: {}",
                        document.id(),
                        attempt,
                        self.attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
