use crate::attributes::{AttributeRecord, TileAttributes, EMPTY_TILE};
use crate::coordinates::{GlobalVertexIndex, TileKey};
use crate::error::TileCacheError;

use landblock_core::SmallKeyHashMap;
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::io::{self, Read, Write};
use std::mem;

/// Where base tile data comes from. Decoding the game's own container format happens behind this trait.
pub trait TileSource: Sync {
    fn try_load(&self, key: TileKey) -> Option<TileAttributes>;

    /// Writes `data` back for `key`. `iteration` is the source's revision counter for that tile.
    fn try_save(&self, key: TileKey, data: &TileAttributes, iteration: u32) -> bool;
}

const CACHE_MAGIC: &[u8; 4] = b"LBTC";
const CACHE_ENTRY_SIZE: usize = mem::size_of::<u16>() + mem::size_of::<TileAttributes>();

/// The immutable base dataset. A tile exists iff it is present here.
#[derive(Clone, Default)]
pub struct TileStore {
    tiles: SmallKeyHashMap<TileKey, Box<TileAttributes>>,
}

impl TileStore {
    /// Loads `keys` from `source` in parallel. Keys the source doesn't have are skipped.
    pub fn populate(source: &impl TileSource, keys: &[TileKey]) -> Self {
        let total = keys.len();
        let completed = Mutex::new(0usize);
        let loaded: Vec<_> = keys
            .par_iter()
            .filter_map(|&key| {
                let tile = source.try_load(key).map(|data| (key, Box::new(data)));
                let mut done = completed.lock();
                *done += 1;
                if *done % 4096 == 0 || *done == total {
                    log::info!("Loaded {}/{} tiles", *done, total);
                }
                tile
            })
            .collect();
        log::debug!("{} of {} requested tiles exist", loaded.len(), total);
        Self {
            tiles: loaded.into_iter().collect(),
        }
    }

    pub fn from_tiles(tiles: impl IntoIterator<Item = (TileKey, TileAttributes)>) -> Self {
        Self {
            tiles: tiles
                .into_iter()
                .map(|(key, data)| (key, Box::new(data)))
                .collect(),
        }
    }

    pub fn get(&self, key: TileKey) -> Option<&TileAttributes> {
        self.tiles.get(&key).map(|b| &**b)
    }

    pub fn record(&self, index: GlobalVertexIndex) -> Option<AttributeRecord> {
        self.get(index.tile())
            .map(|tile| tile[index.vertex().as_usize()])
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        self.tiles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// LZ4-compressed snapshot of every tile, sorted by key.
    pub fn to_cache_blob(&self) -> Result<Vec<u8>, TileCacheError> {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();

        let mut encoder = FrameEncoder::new(Vec::new());
        encoder.write_all(CACHE_MAGIC)?;
        encoder.write_all(&(keys.len() as u32).to_le_bytes())?;
        for key in keys {
            encoder.write_all(&key.into_raw().to_le_bytes())?;
            encoder.write_all(bytemuck::cast_slice(&self.tiles[&key][..]))?;
        }
        let bytes = encoder
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(bytes)
    }

    pub fn from_cache_blob(blob: &[u8]) -> Result<Self, TileCacheError> {
        let mut bytes = Vec::new();
        FrameDecoder::new(blob).read_to_end(&mut bytes)?;

        let rest = bytes
            .strip_prefix(CACHE_MAGIC.as_slice())
            .ok_or(TileCacheError::BadMagic)?;
        if rest.len() < 4 {
            return Err(TileCacheError::Truncated);
        }
        let (count, mut rest) = rest.split_at(4);
        let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
        if rest.len() != count * CACHE_ENTRY_SIZE {
            return Err(TileCacheError::Truncated);
        }

        let mut tiles = SmallKeyHashMap::default();
        tiles.reserve(count);
        while !rest.is_empty() {
            let (entry, tail) = rest.split_at(CACHE_ENTRY_SIZE);
            let raw_key = u16::from_le_bytes([entry[0], entry[1]]);
            let key = TileKey::from_raw(raw_key).ok_or(TileCacheError::InvalidKey(raw_key))?;
            let mut data = Box::new(EMPTY_TILE);
            bytemuck::cast_slice_mut::<_, u8>(&mut data[..]).copy_from_slice(&entry[2..]);
            tiles.insert(key, data);
            rest = tail;
        }
        Ok(Self { tiles })
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
