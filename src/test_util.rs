use crate::session::RenderInvalidator;
use crate::tools::{Raycaster, WorldHit};

use landblock_core::glam::Vec2;
use landblock_map::{
    AttributeRecord, DocumentId, EditTarget, NullObserver, TerrainDocument, TileKey, TileStore,
    WorldUnits, TILE_VERTICES,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Tiles `[0, width) × [0, height)`, all set to `record`.
pub fn uniform_store(width: u8, height: u8, record: AttributeRecord) -> Arc<TileStore> {
    let tiles = (0..width)
        .flat_map(|x| (0..height).map(move |y| TileKey::new(x, y).unwrap()))
        .map(|key| (key, [record; TILE_VERTICES]));
    Arc::new(TileStore::from_tiles(tiles))
}

pub fn target(tiles: Arc<TileStore>) -> EditTarget {
    let document = TerrainDocument::new(DocumentId::from("terrain"), tiles);
    EditTarget::new(Arc::new(document), Arc::new(NullObserver))
}

#[derive(Default)]
pub struct RecordingInvalidator {
    tiles: Mutex<Vec<(u8, u8)>>,
}

impl RecordingInvalidator {
    /// Sorted and deduplicated.
    pub fn take(&self) -> Vec<(u8, u8)> {
        let mut tiles = std::mem::take(&mut *self.tiles.lock());
        tiles.sort_unstable();
        tiles.dedup();
        tiles
    }
}

impl RenderInvalidator for RecordingInvalidator {
    fn invalidate_tile(&self, tile_x: u8, tile_y: u8) {
        self.tiles.lock().push((tile_x, tile_y));
    }
}

/// Screen coordinates are world coordinates. Negative coordinates miss.
pub struct FlatRaycaster;

impl Raycaster for FlatRaycaster {
    fn screen_to_world_hit(&self, x: f32, y: f32) -> Option<WorldHit> {
        (x >= 0.0 && y >= 0.0).then(|| WorldHit::new(WorldUnits(Vec2::new(x, y))))
    }
}
