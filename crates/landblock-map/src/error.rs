use crate::{DocumentId, LayerId, TileKey};

use landblock_core::archived_buf::ArchiveError;
use thiserror::Error;

/// A structural problem with an edit. Always raised before anything is mutated.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EditError {
    #[error("vertex ({x}, {y}) is outside of the map")]
    VertexOutOfBounds { x: i32, y: i32 },
    #[error("tile ({x}, {y}) is outside of the map")]
    TileOutOfBounds { x: i32, y: i32 },
    #[error("tile {0:?} is not loaded")]
    MissingTile(TileKey),
    #[error("road value {0} does not fit in 2 bits")]
    InvalidRoadBits(u8),
    #[error("expected {expected} records, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("no layer with id {0:?}")]
    UnknownLayer(LayerId),
    #[error("a terrain must keep at least one layer")]
    LastLayer,
    #[error("layer position {position} is out of range for {len} layers")]
    LayerPositionOutOfBounds { position: usize, len: usize },
    #[error("invalid brush radius {0}")]
    InvalidRadius(f32),
    #[error("history index {index} is out of range for {len} entries")]
    HistoryIndexOutOfBounds { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("projection does not start with the expected magic bytes")]
    BadMagic,
    #[error("unsupported projection format version {0}")]
    UnsupportedVersion(u16),
    #[error("projection is truncated")]
    Truncated,
    #[error("corrupt projection: {0}")]
    Corrupt(String),
    #[error("failed to encode projection: {0}")]
    Encode(String),
}

impl From<ArchiveError> for ProjectionError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Invalid(reason) => Self::Corrupt(reason),
            ArchiveError::Serialize(reason) => Self::Encode(reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0:?} does not exist")]
    NotFound(DocumentId),
    #[error("document {0:?} already exists")]
    AlreadyExists(DocumentId),
    #[error("corrupt metadata for document {id:?}: {reason}")]
    Metadata { id: DocumentId, reason: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Backend(#[from] sled::Error),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl StoreError {
    /// Transient failures are worth another attempt; the rest will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Backend(sled::Error::Io(_)))
    }
}

/// A document exists in the store but could not be turned back into a live instance. This is never the same as
/// "opened as a new document".
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("failed to read document: {0}")]
    Store(#[from] StoreError),
    #[error("failed to decode document: {0}")]
    Projection(#[from] ProjectionError),
    #[error("document {id:?} has kind {found:?}, expected {expected:?}")]
    WrongKind {
        id: DocumentId,
        expected: &'static str,
        found: String,
    },
}

#[derive(Debug, Error)]
pub enum TileCacheError {
    #[error("tile cache does not start with the expected magic bytes")]
    BadMagic,
    #[error("tile cache is truncated")]
    Truncated,
    #[error("tile cache holds an invalid tile key {0:#06x}")]
    InvalidKey(u16),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
