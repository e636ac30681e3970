use crate::attributes::{AttributeRecord, EMPTY_TILE};
use crate::boundary::writes_for_vertices;
use crate::coordinates::{GlobalVertexIndex, TileKey, VertexIndex};
use crate::terrain::TerrainState;

use landblock_core::{SmallKeyHashMap, SmallKeyHashSet};
use smallvec::SmallVec;
use std::mem;

/// What the target layer held at each index before an edit first touched it. `None` means "no override".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PreviousState {
    entries: SmallKeyHashMap<GlobalVertexIndex, Option<AttributeRecord>>,
}

impl PreviousState {
    /// Keeps the first value seen for `index`.
    pub fn capture(&mut self, index: GlobalVertexIndex, previous: Option<AttributeRecord>) {
        self.entries.entry(index).or_insert(previous);
    }

    pub fn get(&self, index: GlobalVertexIndex) -> Option<Option<AttributeRecord>> {
        self.entries.get(&index).copied()
    }

    pub fn contains(&self, index: GlobalVertexIndex) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlobalVertexIndex, Option<AttributeRecord>)> + '_ {
        self.entries.iter().map(|(i, p)| (*i, *p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A batch of writes to one layer that becomes visible all at once on [`ChangeSet::commit`].
///
/// Commands only write the owning copy of each vertex they edit. Committing recalculates those indices, then folds the
/// boundary writes needed by the other copies into the same set.
pub struct ChangeSet<'a> {
    state: &'a mut TerrainState,
    layer: usize,
    previous: &'a mut PreviousState,
    touched: Vec<GlobalVertexIndex>,
    touched_set: SmallKeyHashSet<GlobalVertexIndex>,
}

impl<'a> ChangeSet<'a> {
    pub(crate) fn new(
        state: &'a mut TerrainState,
        layer: usize,
        previous: &'a mut PreviousState,
    ) -> Self {
        Self {
            state,
            layer,
            previous,
            touched: Vec::new(),
            touched_set: Default::default(),
        }
    }

    pub fn state(&self) -> &TerrainState {
        self.state
    }

    pub fn tile_exists(&self, key: TileKey) -> bool {
        self.state.tiles().contains(key)
    }

    /// The record consumers would see at `index` if this set were committed now.
    pub fn current(&self, index: GlobalVertexIndex) -> AttributeRecord {
        if self.touched_set.contains(&index) {
            self.state.resolve(index)
        } else {
            self.state.merged().get(index)
        }
    }

    pub fn write(&mut self, index: GlobalVertexIndex, record: AttributeRecord) {
        let old = self
            .state
            .layers
            .overrides_mut(self.layer)
            .insert(index, record);
        self.previous.capture(index, old);
        if self.touched_set.insert(index) {
            self.touched.push(index);
        }
    }

    /// Returns the tiles whose merged records changed.
    pub(crate) fn commit(mut self) -> SmallKeyHashSet<TileKey> {
        let primary = mem::take(&mut self.touched);

        let mut by_tile: SmallKeyHashMap<TileKey, SmallVec<[VertexIndex; 16]>> =
            SmallKeyHashMap::default();
        for index in primary.iter() {
            by_tile.entry(index.tile()).or_default().push(index.vertex());
        }
        let mut keys: Vec<_> = by_tile.keys().copied().collect();
        keys.sort_unstable();

        // Every copy of a written vertex gets the same override in the target layer, so that the layer agrees with
        // itself across seams whatever is stacked above or below it.
        let mut spill = Vec::new();
        {
            let state = &*self.state;
            let layer = &state.layers.layers()[self.layer];
            for key in keys {
                let changed = &by_tile[&key];
                let mut data = EMPTY_TILE;
                for &v in changed.iter() {
                    if let Some(record) = layer.get(GlobalVertexIndex::new(key, v)) {
                        data[v.as_usize()] = record;
                    }
                }
                spill.extend(writes_for_vertices(
                    key,
                    &data,
                    changed.iter().copied(),
                    |k| state.tiles().contains(k),
                    |i| layer.get(i),
                ));
            }
        }
        for write in spill.iter() {
            self.write(write.index, write.record);
        }
        if !spill.is_empty() {
            log::trace!("{} boundary writes", spill.len());
        }
        self.recalculate(primary.into_iter().chain(spill.iter().map(|w| w.index)))
    }

    fn recalculate(
        &mut self,
        indices: impl IntoIterator<Item = GlobalVertexIndex>,
    ) -> SmallKeyHashSet<TileKey> {
        let TerrainState {
            tiles,
            layers,
            merged,
        } = &mut *self.state;
        merged.recalculate(tiles, layers, indices)
    }
}
