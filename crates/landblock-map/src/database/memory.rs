use super::{DocumentId, DocumentStore, StoredDocument};
use crate::error::StoreError;

use landblock_core::SmallKeyHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`DocumentStore`] that lives in memory, with counters and failure injection for tests and tools.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<SmallKeyHashMap<DocumentId, StoredDocument>>,
    writes: AtomicUsize,
    failures: AtomicUsize,
}

impl MemoryDocumentStore {
    /// The next `n` writes (create, update or delete) fail with [`StoreError::Unavailable`].
    pub fn fail_next_writes(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Number of successful creates and updates.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn document(&self, id: &DocumentId) -> Option<StoredDocument> {
        self.documents.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(StoreError::Unavailable("injected failure".to_owned()));
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.document(id))
    }

    fn create(&self, id: &DocumentId, kind: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.injected_failure()?;
        let mut documents = self.documents.lock();
        if documents.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        documents.insert(
            id.clone(),
            StoredDocument {
                kind: kind.to_owned(),
                bytes: bytes.to_vec(),
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update(&self, id: &DocumentId, bytes: &[u8]) -> Result<(), StoreError> {
        self.injected_failure()?;
        let mut documents = self.documents.lock();
        let document = documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        document.bytes = bytes.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.injected_failure()?;
        self.documents
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
