mod memory;
mod meta_tree;
mod working_tree;

pub use memory::MemoryDocumentStore;
pub use meta_tree::DocumentMeta;

use crate::error::StoreError;
use meta_tree::{decode_meta, encode_meta, open_meta_tree};
use working_tree::open_working_tree;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Transactional, Tree};
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn sled_key(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredDocument {
    pub kind: String,
    pub bytes: Vec<u8>,
}

/// Persistent storage for document projections.
///
/// Reading a missing document is not an error, but updating or deleting one is.
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>, StoreError>;

    /// Fails with [`StoreError::AlreadyExists`] if `id` is taken.
    fn create(&self, id: &DocumentId, kind: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] if `id` was never created.
    fn update(&self, id: &DocumentId, bytes: &[u8]) -> Result<(), StoreError>;

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError>;

    /// Blocks until previous writes are durable.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// # Document Database
///
/// A [`DocumentStore`] backed by two [`sled::Tree`]s that are always written in the same transaction.
///
/// ## Meta Tree
///
/// Maps each document id to its [`DocumentMeta`]. A document exists iff it has an entry here.
///
/// ## Working Tree
///
/// Maps each document id to the bytes of its latest projection.
pub struct SledDocumentStore {
    meta_tree: Tree,
    working_tree: Tree,
}

impl SledDocumentStore {
    pub fn open(db: &sled::Db, store_name: &str) -> Result<Self, StoreError> {
        Ok(Self {
            meta_tree: open_meta_tree(store_name, db)?,
            working_tree: open_working_tree(store_name, db)?,
        })
    }
}

impl DocumentStore for SledDocumentStore {
    fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>, StoreError> {
        let key = id.sled_key();
        let (meta, bytes) = (&self.meta_tree, &self.working_tree)
            .transaction(|(meta_txn, working_txn)| {
                Ok::<_, ConflictableTransactionError<StoreError>>((
                    meta_txn.get(key)?,
                    working_txn.get(key)?,
                ))
            })
            .map_err(from_transaction_error)?;

        match (meta, bytes) {
            (Some(meta), Some(bytes)) => Ok(Some(StoredDocument {
                kind: decode_meta(id, &meta)?.kind,
                bytes: bytes.to_vec(),
            })),
            (Some(_), None) => Err(StoreError::Metadata {
                id: id.clone(),
                reason: "document has metadata but no payload".to_owned(),
            }),
            (None, _) => Ok(None),
        }
    }

    fn create(&self, id: &DocumentId, kind: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let key = id.sled_key();
        let meta = encode_meta(
            id,
            &DocumentMeta {
                kind: kind.to_owned(),
            },
        )?;
        (&self.meta_tree, &self.working_tree)
            .transaction(|(meta_txn, working_txn)| {
                if meta_txn.get(key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        StoreError::AlreadyExists(id.clone()),
                    ));
                }
                meta_txn.insert(key, meta.as_slice())?;
                working_txn.insert(key, bytes)?;
                Ok(())
            })
            .map_err(from_transaction_error)
    }

    fn update(&self, id: &DocumentId, bytes: &[u8]) -> Result<(), StoreError> {
        let key = id.sled_key();
        (&self.meta_tree, &self.working_tree)
            .transaction(|(meta_txn, working_txn)| {
                if meta_txn.get(key)?.is_none() {
                    return Err(ConflictableTransactionError::Abort(StoreError::NotFound(
                        id.clone(),
                    )));
                }
                working_txn.insert(key, bytes)?;
                Ok(())
            })
            .map_err(from_transaction_error)
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let key = id.sled_key();
        (&self.meta_tree, &self.working_tree)
            .transaction(|(meta_txn, working_txn)| {
                if meta_txn.remove(key)?.is_none() {
                    return Err(ConflictableTransactionError::Abort(StoreError::NotFound(
                        id.clone(),
                    )));
                }
                working_txn.remove(key)?;
                Ok(())
            })
            .map_err(from_transaction_error)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.meta_tree.flush()?;
        self.working_tree.flush()?;
        Ok(())
    }
}

fn from_transaction_error(e: TransactionError<StoreError>) -> StoreError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StoreError::Backend(e),
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
