use crate::attributes::{AttributeRecord, TileAttributes};
use crate::coordinates::{GlobalVertexIndex, TileKey};
use crate::layer::LayerStack;
use crate::tile_store::TileStore;

use landblock_core::{SmallKeyHashMap, SmallKeyHashSet};

/// The value of `index` as every consumer should see it: the topmost visible layer override, else the base tile, else
/// [`AttributeRecord::ZERO`].
pub fn resolve(
    tiles: &TileStore,
    layers: &LayerStack,
    index: GlobalVertexIndex,
) -> AttributeRecord {
    layers
        .top_override(index)
        .or_else(|| tiles.record(index))
        .unwrap_or(AttributeRecord::ZERO)
}

/// Resolved records for every tile in the [`TileStore`].
///
/// Only [`MergedCache::recalculate`] changes it after construction, and only at the indices it is given.
#[derive(Clone, Default)]
pub struct MergedCache {
    tiles: SmallKeyHashMap<TileKey, Box<TileAttributes>>,
}

impl MergedCache {
    /// Resolves every vertex of every existing tile. Only used when a document is opened.
    pub fn build(tiles: &TileStore, layers: &LayerStack) -> Self {
        let mut cache = Self {
            tiles: tiles
                .keys()
                .filter_map(|key| tiles.get(key).map(|data| (key, Box::new(*data))))
                .collect(),
        };
        let overridden: Vec<_> = layers
            .layers()
            .iter()
            .filter(|l| l.is_visible())
            .flat_map(|l| l.indices())
            .collect();
        cache.recalculate(tiles, layers, overridden);
        cache
    }

    pub fn get(&self, index: GlobalVertexIndex) -> AttributeRecord {
        self.tiles
            .get(&index.tile())
            .map(|tile| tile[index.vertex().as_usize()])
            .unwrap_or(AttributeRecord::ZERO)
    }

    pub fn tile(&self, key: TileKey) -> Option<&TileAttributes> {
        self.tiles.get(&key).map(|b| &**b)
    }

    /// Re-resolves exactly `indices`. Indices of tiles that don't exist are ignored. Returns the tiles whose records
    /// changed.
    pub fn recalculate(
        &mut self,
        tiles: &TileStore,
        layers: &LayerStack,
        indices: impl IntoIterator<Item = GlobalVertexIndex>,
    ) -> SmallKeyHashSet<TileKey> {
        let mut changed = SmallKeyHashSet::default();
        for index in indices {
            let key = index.tile();
            if let Some(tile) = self.tiles.get_mut(&key) {
                let resolved = resolve(tiles, layers, index);
                let slot = &mut tile[index.vertex().as_usize()];
                if *slot != resolved {
                    *slot = resolved;
                    changed.insert(key);
                }
            }
        }
        changed
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;
    use crate::coordinates::VertexIndex;
    use crate::test_util::uniform_tile;

    fn setup() -> (TileStore, LayerStack, GlobalVertexIndex) {
        let key = TileKey::new(10, 10).unwrap();
        let tiles =
            TileStore::from_tiles([(key, uniform_tile(AttributeRecord::ZERO.with_texture(2)))]);
        let index = GlobalVertexIndex::new(key, VertexIndex::new(4, 4).unwrap());
        (tiles, LayerStack::default(), index)
    }

    #[test]
    fn resolve_falls_through_to_base_and_zero() {
        let (tiles, layers, index) = setup();
        assert_eq!(resolve(&tiles, &layers, index).texture_type, 2);

        let missing = GlobalVertexIndex::new(
            TileKey::new(0, 0).unwrap(),
            VertexIndex::new(0, 0).unwrap(),
        );
        assert_eq!(resolve(&tiles, &layers, missing), AttributeRecord::ZERO);
    }

    #[test]
    fn recalculate_tracks_override_removal() {
        let (tiles, mut layers, index) = setup();
        let mut cache = MergedCache::build(&tiles, &layers);
        let base = layers.active();
        let top = layers.add_layer("top");

        let texture = |t| Some(AttributeRecord::ZERO.with_texture(t));
        layers.set_override(base, index, texture(5)).unwrap();
        layers.set_override(top, index, texture(6)).unwrap();
        // Nothing is recomputed until asked.
        assert_eq!(cache.get(index).texture_type, 2);

        let changed = cache.recalculate(&tiles, &layers, [index]);
        assert_eq!(changed.len(), 1);
        assert_eq!(cache.get(index).texture_type, 6);

        layers.set_override(top, index, None).unwrap();
        cache.recalculate(&tiles, &layers, [index]);
        assert_eq!(cache.get(index).texture_type, 5);

        layers.set_override(base, index, None).unwrap();
        cache.recalculate(&tiles, &layers, [index]);
        assert_eq!(cache.get(index).texture_type, 2);
        assert!(cache.recalculate(&tiles, &layers, [index]).is_empty());
    }

    #[test]
    fn build_applies_existing_overrides() {
        let (tiles, mut layers, index) = setup();
        let base = layers.active();
        let hidden = layers.add_layer("hidden");
        let road = |r| Some(AttributeRecord::ZERO.with_road(r));
        layers.set_override(base, index, road(1)).unwrap();
        layers.set_override(hidden, index, road(2)).unwrap();
        layers.set_layer_visible(hidden, false).unwrap();

        let cache = MergedCache::build(&tiles, &layers);
        assert_eq!(cache.get(index), AttributeRecord::ZERO.with_road(1));
        for v in index.tile().vertices().filter(|&v| v != index) {
            assert_eq!(cache.get(v), resolve(&tiles, &layers, v));
        }
    }
}
