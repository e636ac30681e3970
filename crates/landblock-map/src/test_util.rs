use crate::attributes::{AttributeRecord, TileAttributes, TILE_VERTICES};
use crate::coordinates::TileKey;
use crate::database::{DocumentId, DocumentStore, MemoryDocumentStore, StoredDocument};
use crate::edit::{EditObserver, EditTarget};
use crate::error::{ProjectionError, StoreError};
use crate::persistence::{Document, Projection};
use crate::terrain::TerrainDocument;
use crate::tile_store::{TileSource, TileStore};

use landblock_core::SmallKeyHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn uniform_tile(record: AttributeRecord) -> TileAttributes {
    [record; TILE_VERTICES]
}

/// Every record differs, and the pattern depends on `seed`.
pub fn checkered_tile(seed: u8) -> TileAttributes {
    let mut tile = uniform_tile(AttributeRecord::ZERO);
    for (i, record) in tile.iter_mut().enumerate() {
        *record = AttributeRecord::from_u32((i as u32) << 8 | seed as u32);
    }
    tile
}

/// Tiles `[0, width) × [0, height)`, all set to `record`.
pub fn uniform_store(width: u8, height: u8, record: AttributeRecord) -> Arc<TileStore> {
    let tiles = (0..width)
        .flat_map(|x| (0..height).map(move |y| TileKey::new(x, y).unwrap()))
        .map(|key| (key, uniform_tile(record)));
    Arc::new(TileStore::from_tiles(tiles))
}

#[derive(Default)]
pub struct MemoryTileSource {
    tiles: Mutex<SmallKeyHashMap<TileKey, TileAttributes>>,
    pub saves: Mutex<Vec<(TileKey, u32)>>,
    pub reject_saves: Mutex<Vec<TileKey>>,
}

impl MemoryTileSource {
    pub fn insert(&self, key: TileKey, data: TileAttributes) {
        self.tiles.lock().insert(key, data);
    }

    pub fn tile(&self, key: TileKey) -> Option<TileAttributes> {
        self.tiles.lock().get(&key).copied()
    }
}

impl TileSource for MemoryTileSource {
    fn try_load(&self, key: TileKey) -> Option<TileAttributes> {
        self.tile(key)
    }

    fn try_save(&self, key: TileKey, data: &TileAttributes, iteration: u32) -> bool {
        if self.reject_saves.lock().contains(&key) {
            return false;
        }
        self.tiles.lock().insert(key, *data);
        self.saves.lock().push((key, iteration));
        true
    }
}

/// A document whose projection is just its revision.
pub struct CounterDocument {
    id: DocumentId,
    revision: AtomicU64,
    pub projections: AtomicUsize,
}

impl CounterDocument {
    pub fn new(id: &str) -> Self {
        Self {
            id: DocumentId::from(id),
            revision: AtomicU64::new(0),
            projections: AtomicUsize::new(0),
        }
    }

    pub fn bump(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

impl Document for CounterDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "counter"
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn save_projection(&self) -> Result<Projection, ProjectionError> {
        self.projections.fetch_add(1, Ordering::SeqCst);
        let revision = self.revision();
        Ok(Projection {
            revision,
            bytes: revision.to_le_bytes().to_vec(),
        })
    }
}

/// Remembers every notification.
#[derive(Default)]
pub struct RecordingObserver {
    pub invalidated: Mutex<Vec<TileKey>>,
    pub changes: AtomicUsize,
}

impl RecordingObserver {
    pub fn take_invalidated(&self) -> Vec<TileKey> {
        let mut tiles = std::mem::take(&mut *self.invalidated.lock());
        tiles.sort_unstable();
        tiles.dedup();
        tiles
    }
}

impl EditObserver for RecordingObserver {
    fn tiles_invalidated(&self, tiles: &[TileKey]) {
        self.invalidated.lock().extend_from_slice(tiles);
    }

    fn document_changed(&self, _document: &Arc<TerrainDocument>) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn target(tiles: Arc<TileStore>) -> (EditTarget, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let document = Arc::new(TerrainDocument::new(DocumentId::from("terrain"), tiles));
    (EditTarget::new(document, observer.clone()), observer)
}

/// A [`MemoryDocumentStore`] whose writes take `delay`, can be held back, and record how many ran at once.
#[derive(Default)]
pub struct SlowStore {
    pub inner: MemoryDocumentStore,
    delay: Duration,
    blocked: AtomicBool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    /// Writes wait until [`Self::unblock`].
    pub fn block(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    pub fn unblock(&self) {
        self.blocked.store(false, Ordering::SeqCst);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most writes ever in flight at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn slow_write<R>(&self, write: impl FnOnce(&MemoryDocumentStore) -> R) -> R {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        while self.blocked.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        let result = write(&self.inner);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl DocumentStore for SlowStore {
    fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>, StoreError> {
        self.inner.get(id)
    }

    fn create(&self, id: &DocumentId, kind: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.slow_write(|store| store.create(id, kind, bytes))
    }

    fn update(&self, id: &DocumentId, bytes: &[u8]) -> Result<(), StoreError> {
        self.slow_write(|store| store.update(id, bytes))
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.slow_write(|store| store.delete(id))
    }
}
