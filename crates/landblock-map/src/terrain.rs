use crate::attributes::{AttributeRecord, TileAttributes};
use crate::boundary::writes_for_tile;
use crate::change_set::{ChangeSet, PreviousState};
use crate::coordinates::{vertex_copies, GlobalVertexIndex, TileKey};
use crate::database::{DocumentId, DocumentStore};
use crate::error::{EditError, OpenError, ProjectionError};
use crate::layer::{LayerId, LayerStack};
use crate::merge::{resolve, MergedCache};
use crate::persistence::{Document, Projection};
use crate::projection::TerrainProjection;
use crate::tile_store::{TileSource, TileStore};
use crate::units::VertexUnits;

use landblock_core::glam::IVec2;
use landblock_core::SmallKeyHashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const TERRAIN_KIND: &str = "terrain";

/// Everything guarded by a [`TerrainDocument`]'s state lock.
pub struct TerrainState {
    pub(crate) tiles: Arc<TileStore>,
    pub(crate) layers: LayerStack,
    pub(crate) merged: MergedCache,
}

impl TerrainState {
    fn new(tiles: Arc<TileStore>, layers: LayerStack) -> Self {
        let merged = MergedCache::build(&tiles, &layers);
        Self {
            tiles,
            layers,
            merged,
        }
    }

    pub fn tiles(&self) -> &TileStore {
        &self.tiles
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn merged(&self) -> &MergedCache {
        &self.merged
    }

    pub fn resolve(&self, index: GlobalVertexIndex) -> AttributeRecord {
        resolve(&self.tiles, &self.layers, index)
    }

    /// The copy of the vertex at `p` that edits should target: the first copy, in canonical order, whose tile exists.
    pub fn owner(&self, p: VertexUnits<IVec2>) -> Option<GlobalVertexIndex> {
        vertex_copies(p)
            .into_iter()
            .find(|index| self.tiles.contains(index.tile()))
    }

    fn recalculate(
        &mut self,
        indices: impl IntoIterator<Item = GlobalVertexIndex>,
    ) -> SmallKeyHashSet<TileKey> {
        self.merged.recalculate(&self.tiles, &self.layers, indices)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DocumentOrigin {
    /// Decoded from a stored projection.
    Loaded,
    /// The store had nothing for this id.
    New,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub overrides: usize,
}

/// The single live instance of one terrain document.
///
/// Locks are always taken in the order state, then dirty.
pub struct TerrainDocument {
    id: DocumentId,
    state: Mutex<TerrainState>,
    dirty: Mutex<SmallKeyHashSet<TileKey>>,
    revision: AtomicU64,
    origin: DocumentOrigin,
}

impl TerrainDocument {
    pub fn new(id: DocumentId, tiles: Arc<TileStore>) -> Self {
        Self::with_layers(id, tiles, LayerStack::default(), 0, DocumentOrigin::New)
    }

    pub fn from_projection(
        id: DocumentId,
        tiles: Arc<TileStore>,
        projection: &TerrainProjection,
    ) -> Result<Self, ProjectionError> {
        let layers = LayerStack::from_projection(projection)?;
        Ok(Self::with_layers(
            id,
            tiles,
            layers,
            projection.revision,
            DocumentOrigin::Loaded,
        ))
    }

    /// Loads the document from `store`, or starts a new one if the store doesn't have it. A stored document that can't
    /// be decoded is an error, never a new document.
    pub fn open(
        id: DocumentId,
        tiles: Arc<TileStore>,
        store: &dyn DocumentStore,
    ) -> Result<Self, OpenError> {
        match store.get(&id)? {
            None => {
                log::debug!("Creating new terrain {}", id);
                Ok(Self::new(id, tiles))
            }
            Some(stored) if stored.kind != TERRAIN_KIND => Err(OpenError::WrongKind {
                id,
                expected: TERRAIN_KIND,
                found: stored.kind,
            }),
            Some(stored) => {
                let projection = TerrainProjection::decode(&stored.bytes)?;
                log::debug!("Loaded terrain {} at revision {}", id, projection.revision);
                Ok(Self::from_projection(id, tiles, &projection)?)
            }
        }
    }

    fn with_layers(
        id: DocumentId,
        tiles: Arc<TileStore>,
        layers: LayerStack,
        revision: u64,
        origin: DocumentOrigin,
    ) -> Self {
        Self {
            id,
            state: Mutex::new(TerrainState::new(tiles, layers)),
            dirty: Default::default(),
            revision: AtomicU64::new(revision),
            origin,
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn origin(&self) -> DocumentOrigin {
        self.origin
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&TerrainState) -> R) -> R {
        f(&*self.state.lock())
    }

    /// The merged record at `index`.
    pub fn read(&self, index: GlobalVertexIndex) -> AttributeRecord {
        self.state.lock().merged.get(index)
    }

    /// The merged record of the vertex at `p`, if any tile containing it exists.
    pub fn read_vertex(&self, p: VertexUnits<IVec2>) -> Option<AttributeRecord> {
        let state = self.state.lock();
        state.owner(p).map(|owner| state.merged.get(owner))
    }

    pub fn tile(&self, key: TileKey) -> Option<TileAttributes> {
        self.state.lock().merged.tile(key).copied()
    }

    /// Resolves `index` through the layer stack without consulting the merged cache.
    pub fn resolve(&self, index: GlobalVertexIndex) -> AttributeRecord {
        self.state.lock().resolve(index)
    }

    /// Re-resolves `indices` into the merged cache and returns the tiles that changed.
    pub fn recalculate(
        &self,
        indices: impl IntoIterator<Item = GlobalVertexIndex>,
    ) -> Vec<TileKey> {
        let mut state = self.state.lock();
        sorted(state.recalculate(indices))
    }

    pub fn active_layer(&self) -> LayerId {
        self.state.lock().layers.active()
    }

    pub fn layers(&self) -> Vec<LayerInfo> {
        self.state
            .lock()
            .layers
            .layers()
            .iter()
            .map(|l| LayerInfo {
                id: l.id(),
                name: l.name().to_owned(),
                visible: l.is_visible(),
                overrides: l.len(),
            })
            .collect()
    }

    /// Pushes a new empty layer on top. Nothing needs to be recalculated.
    pub fn add_layer(&self, name: &str) -> LayerId {
        let mut state = self.state.lock();
        let id = state.layers.add_layer(name);
        self.revision.fetch_add(1, Ordering::SeqCst);
        id
    }

    pub fn remove_layer(&self, id: LayerId) -> Result<Vec<TileKey>, EditError> {
        self.mutate(|state| {
            let affected = state.layers.remove_layer(id)?;
            Ok(((), state.recalculate(affected)))
        })
        .map(|(_, tiles)| tiles)
    }

    pub fn move_layer(&self, id: LayerId, position: usize) -> Result<Vec<TileKey>, EditError> {
        self.mutate(|state| {
            let affected = state.layers.move_layer(id, position)?;
            Ok(((), state.recalculate(affected)))
        })
        .map(|(_, tiles)| tiles)
    }

    pub fn rename_layer(&self, id: LayerId, name: &str) -> Result<(), EditError> {
        self.mutate(|state| {
            state.layers.rename_layer(id, name)?;
            Ok(((), Default::default()))
        })
        .map(|_| ())
    }

    pub fn set_layer_visible(
        &self,
        id: LayerId,
        visible: bool,
    ) -> Result<Vec<TileKey>, EditError> {
        self.mutate(|state| {
            let affected = state.layers.set_layer_visible(id, visible)?;
            Ok(((), state.recalculate(affected)))
        })
        .map(|(_, tiles)| tiles)
    }

    pub fn set_active_layer(&self, id: LayerId) -> Result<(), EditError> {
        self.mutate(|state| {
            state.layers.set_active_layer(id)?;
            Ok(((), Default::default()))
        })
        .map(|_| ())
    }

    /// Runs `f` against a [`ChangeSet`] on `layer` and commits it, recording first-touch values into `previous`.
    pub fn edit<R>(
        &self,
        layer: LayerId,
        previous: &mut PreviousState,
        f: impl FnOnce(&mut ChangeSet) -> R,
    ) -> Result<(R, Vec<TileKey>), EditError> {
        self.mutate(|state| {
            let position = state.layers.position_or_err(layer)?;
            let mut changes = ChangeSet::new(state, position, previous);
            let result = f(&mut changes);
            Ok((result, changes.commit()))
        })
    }

    /// Puts back the override values in `previous` on `layer`, exactly reversing the edit that captured them.
    pub fn restore(
        &self,
        layer: LayerId,
        previous: &PreviousState,
    ) -> Result<Vec<TileKey>, EditError> {
        self.mutate(|state| {
            let position = state.layers.position_or_err(layer)?;
            let overrides = state.layers.overrides_mut(position);
            for (index, record) in previous.iter() {
                match record {
                    Some(record) => overrides.insert(index, record),
                    None => overrides.remove(&index),
                };
            }
            Ok(((), state.recalculate(previous.iter().map(|(index, _)| index))))
        })
        .map(|(_, tiles)| tiles)
    }

    /// Makes every existing neighbor of `keys` agree with them at shared vertices, writing to the active layer outside of
    /// any history. Returns the number of vertex copies that were rewritten.
    pub fn repair_seams(&self, keys: impl IntoIterator<Item = TileKey>) -> usize {
        let mut keys: Vec<_> = keys.into_iter().collect();
        keys.sort_unstable();
        let mut state = self.state.lock();
        let position = match state.layers.position(state.layers.active()) {
            Some(p) => p,
            None => return 0,
        };

        let mut repaired = 0;
        let mut affected = SmallKeyHashSet::default();
        for key in keys {
            let data = match state.merged.tile(key) {
                Some(data) => *data,
                None => continue,
            };
            let writes = writes_for_tile(
                key,
                &data,
                |k| state.tiles.contains(k),
                |i| Some(state.merged.get(i)),
            );
            if writes.is_empty() {
                continue;
            }
            repaired += writes.len();
            // The source copy gets the override too, so the layer stays consistent across the seam on its own.
            let mut indices = Vec::new();
            for w in writes.iter() {
                for copy in vertex_copies(w.index.position()) {
                    if state.tiles.contains(copy.tile()) {
                        indices.push((copy, w.record));
                    }
                }
            }
            let overrides = state.layers.overrides_mut(position);
            for &(index, record) in indices.iter() {
                overrides.insert(index, record);
            }
            affected.extend(state.recalculate(indices.iter().map(|&(index, _)| index)));
        }
        if repaired > 0 {
            log::info!("Repaired {} seam vertices in {}", repaired, self.id);
            self.dirty.lock().extend(affected);
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
        repaired
    }

    /// Tiles changed since they were last written back to a [`TileSource`].
    pub fn dirty_tiles(&self) -> Vec<TileKey> {
        let mut tiles: Vec<_> = self.dirty.lock().iter().copied().collect();
        tiles.sort_unstable();
        tiles
    }

    /// Writes the merged records of every dirty tile through `source`. Tiles that saved stop being dirty. Returns how
    /// many saved.
    pub fn commit_to_source(&self, source: &impl TileSource, iteration: u32) -> usize {
        let state = self.state.lock();
        let mut dirty = self.dirty.lock();
        let mut keys: Vec<_> = dirty.iter().copied().collect();
        keys.sort_unstable();

        let mut saved = 0;
        for key in keys {
            let data = match state.merged.tile(key) {
                Some(data) => data,
                None => {
                    dirty.remove(&key);
                    continue;
                }
            };
            if source.try_save(key, data, iteration) {
                dirty.remove(&key);
                saved += 1;
            } else {
                log::warn!("Failed to save tile {:?} to the source", key);
            }
        }
        saved
    }

    pub fn to_projection(&self) -> TerrainProjection {
        let state = self.state.lock();
        state.layers.to_projection(self.revision())
    }

    /// Applies `f` under the state lock, then marks its affected tiles dirty and bumps the revision.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut TerrainState) -> Result<(R, SmallKeyHashSet<TileKey>), EditError>,
    ) -> Result<(R, Vec<TileKey>), EditError> {
        let mut state = self.state.lock();
        let (result, affected) = f(&mut *state)?;
        if !affected.is_empty() {
            self.dirty.lock().extend(affected.iter().copied());
        }
        self.revision.fetch_add(1, Ordering::SeqCst);
        drop(state);
        Ok((result, sorted(affected)))
    }
}

impl Document for TerrainDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn kind(&self) -> &'static str {
        TERRAIN_KIND
    }

    fn revision(&self) -> u64 {
        TerrainDocument::revision(self)
    }

    fn save_projection(&self) -> Result<Projection, ProjectionError> {
        // Holding the state lock keeps the revision and the layers in agreement.
        let state = self.state.lock();
        let revision = self.revision();
        let bytes = state.layers.to_projection(revision).encode()?;
        Ok(Projection { revision, bytes })
    }
}

fn sorted(tiles: SmallKeyHashSet<TileKey>) -> Vec<TileKey> {
    let mut tiles: Vec<_> = tiles.into_iter().collect();
    tiles.sort_unstable();
    tiles
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
