use crate::error::ProjectionError;

use landblock_core::archived_buf::{archive_value, ArchivedBuf};
use rkyv::{Archive, Deserialize, Serialize};

/// Every terrain projection starts with these bytes.
pub const TERRAIN_MAGIC: [u8; 4] = *b"LBTR";
pub const TERRAIN_FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = TERRAIN_MAGIC.len() + 2;

/// The persisted form of a terrain document. Base tiles are not part of it; only the layers are.
#[derive(Archive, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct TerrainProjection {
    pub revision: u64,
    pub active_layer: u64,
    pub next_layer_id: u64,
    /// Bottom to top.
    pub layers: Vec<LayerProjection>,
}

#[derive(Archive, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct LayerProjection {
    pub id: u64,
    pub name: String,
    pub visible: bool,
    /// Sorted by `index`.
    pub entries: Vec<LayerEntry>,
}

#[derive(Archive, Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[archive(check_bytes)]
pub struct LayerEntry {
    /// Raw [`GlobalVertexIndex`](crate::GlobalVertexIndex).
    pub index: u32,
    /// Packed [`AttributeRecord`](crate::AttributeRecord).
    pub record: u32,
}

impl TerrainProjection {
    /// Magic, little-endian format version, then the rkyv archive.
    pub fn encode(&self) -> Result<Vec<u8>, ProjectionError> {
        let archive = archive_value::<_, 4096>(self)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + archive.len());
        bytes.extend_from_slice(&TERRAIN_MAGIC);
        bytes.extend_from_slice(&TERRAIN_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(archive.as_slice());
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProjectionError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProjectionError::Truncated);
        }
        let (header, archive) = bytes.split_at(HEADER_LEN);
        if header[..4] != TERRAIN_MAGIC {
            return Err(ProjectionError::BadMagic);
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != TERRAIN_FORMAT_VERSION {
            return Err(ProjectionError::UnsupportedVersion(version));
        }
        if archive.is_empty() {
            return Err(ProjectionError::Truncated);
        }
        Ok(ArchivedBuf::<Self>::check(archive)?.deserialize())
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
