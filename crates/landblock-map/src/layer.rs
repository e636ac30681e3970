use crate::attributes::AttributeRecord;
use crate::coordinates::GlobalVertexIndex;
use crate::error::{EditError, ProjectionError};
use crate::projection::{LayerEntry, LayerProjection, TerrainProjection};

use landblock_core::{SmallKeyHashMap, SmallKeyHashSet};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LayerId(pub u64);

/// A sparse set of overrides on top of the base tiles.
#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerId,
    name: String,
    visible: bool,
    overrides: SmallKeyHashMap<GlobalVertexIndex, AttributeRecord>,
}

impl Layer {
    fn new(id: LayerId, name: String) -> Self {
        Self {
            id,
            name,
            visible: true,
            overrides: Default::default(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn get(&self, index: GlobalVertexIndex) -> Option<AttributeRecord> {
        self.overrides.get(&index).copied()
    }

    pub fn indices(&self) -> impl Iterator<Item = GlobalVertexIndex> + '_ {
        self.overrides.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Layers ordered bottom to top. There is always at least one layer, and exactly one of them is active.
///
/// Every operation that can change what [`resolve`](crate::resolve) returns hands back the global indices it may have
/// affected, so the caller can recalculate just those.
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: LayerId,
    next_id: u64,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self {
            layers: vec![Layer::new(LayerId(0), "Base".to_owned())],
            active: LayerId(0),
            next_id: 1,
        }
    }
}

impl LayerStack {
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn active(&self) -> LayerId {
        self.active
    }

    pub fn active_layer(&self) -> &Layer {
        // Removal never leaves `active` dangling.
        self.layer(self.active).unwrap_or(&self.layers[self.layers.len() - 1])
    }

    /// Topmost visible override of `index`.
    pub fn top_override(&self, index: GlobalVertexIndex) -> Option<AttributeRecord> {
        self.layers
            .iter()
            .rev()
            .filter(|l| l.visible)
            .find_map(|l| l.get(index))
    }

    /// Pushes a new empty layer on top of the stack.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(Layer::new(id, name.into()));
        id
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Vec<GlobalVertexIndex>, EditError> {
        let position = self.position_or_err(id)?;
        if self.layers.len() == 1 {
            return Err(EditError::LastLayer);
        }
        let removed = self.layers.remove(position);
        if self.active == id {
            self.active = self.layers[position.saturating_sub(1)].id;
        }
        Ok(visible_indices(&removed))
    }

    /// Moves the layer to `position`, counted from the bottom after removal.
    pub fn move_layer(
        &mut self,
        id: LayerId,
        position: usize,
    ) -> Result<Vec<GlobalVertexIndex>, EditError> {
        let from = self.position_or_err(id)?;
        if position >= self.layers.len() {
            return Err(EditError::LayerPositionOutOfBounds {
                position,
                len: self.layers.len(),
            });
        }
        if from == position {
            return Ok(Vec::new());
        }
        let layer = self.layers.remove(from);
        let affected = visible_indices(&layer);
        self.layers.insert(position, layer);
        Ok(affected)
    }

    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> Result<(), EditError> {
        let position = self.position_or_err(id)?;
        self.layers[position].name = name.into();
        Ok(())
    }

    pub fn set_layer_visible(
        &mut self,
        id: LayerId,
        visible: bool,
    ) -> Result<Vec<GlobalVertexIndex>, EditError> {
        let position = self.position_or_err(id)?;
        let layer = &mut self.layers[position];
        if layer.visible == visible {
            return Ok(Vec::new());
        }
        layer.visible = visible;
        Ok(layer.indices().collect())
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> Result<(), EditError> {
        self.position_or_err(id)?;
        self.active = id;
        Ok(())
    }

    pub(crate) fn set_override(
        &mut self,
        id: LayerId,
        index: GlobalVertexIndex,
        record: Option<AttributeRecord>,
    ) -> Result<Option<AttributeRecord>, EditError> {
        let position = self.position_or_err(id)?;
        let overrides = &mut self.layers[position].overrides;
        Ok(match record {
            Some(record) => overrides.insert(index, record),
            None => overrides.remove(&index),
        })
    }

    pub(crate) fn overrides_mut(
        &mut self,
        position: usize,
    ) -> &mut SmallKeyHashMap<GlobalVertexIndex, AttributeRecord> {
        &mut self.layers[position].overrides
    }

    pub(crate) fn position_or_err(&self, id: LayerId) -> Result<usize, EditError> {
        self.position(id).ok_or(EditError::UnknownLayer(id))
    }

    pub fn to_projection(&self, revision: u64) -> TerrainProjection {
        TerrainProjection {
            revision,
            active_layer: self.active.0,
            next_layer_id: self.next_id,
            layers: self
                .layers
                .iter()
                .map(|layer| {
                    let mut entries: Vec<_> = layer
                        .overrides
                        .iter()
                        .map(|(index, record)| LayerEntry {
                            index: index.into_raw(),
                            record: record.to_u32(),
                        })
                        .collect();
                    entries.sort_unstable_by_key(|e| e.index);
                    LayerProjection {
                        id: layer.id.0,
                        name: layer.name.clone(),
                        visible: layer.visible,
                        entries,
                    }
                })
                .collect(),
        }
    }

    pub fn from_projection(projection: &TerrainProjection) -> Result<Self, ProjectionError> {
        if projection.layers.is_empty() {
            return Err(ProjectionError::Corrupt("terrain has no layers".to_owned()));
        }
        let mut seen = SmallKeyHashSet::default();
        let mut layers = Vec::with_capacity(projection.layers.len());
        for lp in projection.layers.iter() {
            if lp.id >= projection.next_layer_id || !seen.insert(lp.id) {
                return Err(ProjectionError::Corrupt(format!("bad layer id {}", lp.id)));
            }
            let mut layer = Layer::new(LayerId(lp.id), lp.name.clone());
            layer.visible = lp.visible;
            for entry in lp.entries.iter() {
                let index = GlobalVertexIndex::from_raw(entry.index).ok_or_else(|| {
                    ProjectionError::Corrupt(format!("bad vertex index {}", entry.index))
                })?;
                layer
                    .overrides
                    .insert(index, AttributeRecord::from_u32(entry.record));
            }
            layers.push(layer);
        }
        if !seen.contains(&projection.active_layer) {
            return Err(ProjectionError::Corrupt(format!(
                "active layer {} does not exist",
                projection.active_layer
            )));
        }
        Ok(Self {
            layers,
            active: LayerId(projection.active_layer),
            next_id: projection.next_layer_id,
        })
    }
}

fn visible_indices(layer: &Layer) -> Vec<GlobalVertexIndex> {
    if layer.visible {
        layer.indices().collect()
    } else {
        Vec::new()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
