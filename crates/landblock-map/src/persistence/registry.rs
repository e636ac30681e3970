use crate::database::DocumentId;

use landblock_core::SmallKeyHashMap;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::sync::Arc;

/// Guarantees at most one live instance per [`DocumentId`].
pub struct DocumentRegistry<D> {
    documents: Mutex<SmallKeyHashMap<DocumentId, Arc<D>>>,
}

impl<D> Default for DocumentRegistry<D> {
    fn default() -> Self {
        Self {
            documents: Default::default(),
        }
    }
}

impl<D> DocumentRegistry<D> {
    /// Returns the live instance for `id`, opening one with `open` if there is none.
    ///
    /// `open` runs without holding the registry lock, so two threads may both open the same document. Only the first to
    /// finish is registered; the other drops its copy and gets the winner.
    pub fn get_or_open<E>(
        &self,
        id: &DocumentId,
        open: impl FnOnce() -> Result<D, E>,
    ) -> Result<Arc<D>, E> {
        if let Some(existing) = self.get(id) {
            return Ok(existing);
        }
        let opened = Arc::new(open()?);
        match self.documents.lock().entry(id.clone()) {
            Entry::Occupied(winner) => {
                log::debug!("Lost the race to open {}, using the live instance", id);
                Ok(winner.get().clone())
            }
            Entry::Vacant(slot) => Ok(slot.insert(opened).clone()),
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<Arc<D>> {
        self.documents.lock().get(id).cloned()
    }

    /// Forgets the live instance. Holders of the `Arc` keep it alive, but the next `get_or_open` opens a new one.
    pub fn close(&self, id: &DocumentId) -> Option<Arc<D>> {
        self.documents.lock().remove(id)
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
