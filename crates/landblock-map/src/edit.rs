//! Undoable terrain edits.
//!
//! Every command writes only to one layer (the active layer when it first runs) and remembers what that layer held at
//! each index before it was first touched. Undo puts those values back, which restores the merged cache exactly, including
//! the boundary writes that were folded into the edit.

mod bucket_fill;
mod compound;
mod line;
mod paint;

pub use bucket_fill::*;
pub use compound::*;
pub use line::*;
pub use paint::*;

use crate::change_set::{ChangeSet, PreviousState};
use crate::coordinates::TileKey;
use crate::error::EditError;
use crate::layer::LayerId;
use crate::terrain::TerrainDocument;

use std::sync::Arc;

/// Receives the side effects of an edit.
pub trait EditObserver: Send + Sync {
    /// Merged records of `tiles` changed and any derived render data is stale.
    fn tiles_invalidated(&self, tiles: &[TileKey]);

    /// The document needs saving.
    fn document_changed(&self, document: &Arc<TerrainDocument>);
}

/// Does nothing.
pub struct NullObserver;

impl EditObserver for NullObserver {
    fn tiles_invalidated(&self, _tiles: &[TileKey]) {}

    fn document_changed(&self, _document: &Arc<TerrainDocument>) {}
}

/// The document a command edits and who to tell about it.
#[derive(Clone)]
pub struct EditTarget {
    pub document: Arc<TerrainDocument>,
    pub observer: Arc<dyn EditObserver>,
}

impl EditTarget {
    pub fn new(document: Arc<TerrainDocument>, observer: Arc<dyn EditObserver>) -> Self {
        Self { document, observer }
    }

    pub fn notify(&self, tiles: &[TileKey]) {
        if !tiles.is_empty() {
            self.observer.tiles_invalidated(tiles);
        }
        self.observer.document_changed(&self.document);
    }
}

#[derive(Clone, Debug)]
pub enum TerrainCommand {
    Paint(PaintCommand),
    BucketFill(BucketFillCommand),
    DrawLine(DrawLineCommand),
    SetRoadBit(SetRoadBitCommand),
    Compound(CompoundCommand),
}

impl TerrainCommand {
    /// Applies the command. Running it again after [`Self::undo`] redoes it.
    pub fn execute(&mut self, target: &EditTarget) -> Result<(), EditError> {
        match self {
            Self::Paint(c) => c.execute(target),
            Self::BucketFill(c) => c.execute(target),
            Self::DrawLine(c) => c.execute(target),
            Self::SetRoadBit(c) => c.execute(target),
            Self::Compound(c) => c.execute(target),
        }
    }

    pub fn undo(&mut self, target: &EditTarget) -> Result<(), EditError> {
        match self {
            Self::Paint(c) => c.undo(target),
            Self::BucketFill(c) => c.undo(target),
            Self::DrawLine(c) => c.undo(target),
            Self::SetRoadBit(c) => c.undo(target),
            Self::Compound(c) => c.undo(target),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Paint(_) => "Paint".to_owned(),
            Self::BucketFill(_) => "Bucket fill".to_owned(),
            Self::DrawLine(_) => "Draw line".to_owned(),
            Self::SetRoadBit(_) => "Set road".to_owned(),
            Self::Compound(c) => c.label().to_owned(),
        }
    }

    /// True if the last execution changed nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Paint(c) => c.previous().is_empty(),
            Self::BucketFill(c) => c.previous().is_empty(),
            Self::DrawLine(c) => c.previous().is_empty(),
            Self::SetRoadBit(c) => c.previous().is_empty(),
            Self::Compound(c) => c.is_empty(),
        }
    }

    /// True if undoing or redoing the command would touch `layer`.
    pub fn writes_to(&self, layer: LayerId) -> bool {
        let pinned = match self {
            Self::Paint(c) => c.layer(),
            Self::BucketFill(c) => c.layer(),
            Self::DrawLine(c) => c.layer(),
            Self::SetRoadBit(c) => c.layer(),
            Self::Compound(c) => return c.writes_to(layer),
        };
        pinned == Some(layer)
    }
}

macro_rules! impl_from_command {
    ($variant:ident, $t:ty) => {
        impl From<$t> for TerrainCommand {
            fn from(c: $t) -> Self {
                Self::$variant(c)
            }
        }
    };
}

impl_from_command!(Paint, PaintCommand);
impl_from_command!(BucketFill, BucketFillCommand);
impl_from_command!(DrawLine, DrawLineCommand);
impl_from_command!(SetRoadBit, SetRoadBitCommand);
impl_from_command!(Compound, CompoundCommand);

/// The layer and captured state shared by every single-layer command.
#[derive(Clone, Debug, Default)]
pub(crate) struct EditRecord {
    layer: Option<LayerId>,
    previous: PreviousState,
}

impl EditRecord {
    /// Runs `f` on a fresh capture. The target layer is pinned on the first run so that redo edits the same layer.
    pub(crate) fn apply(
        &mut self,
        target: &EditTarget,
        f: impl FnOnce(&mut ChangeSet),
    ) -> Result<(), EditError> {
        let layer = *self
            .layer
            .get_or_insert_with(|| target.document.active_layer());
        self.previous.clear();
        let (_, tiles) = target.document.edit(layer, &mut self.previous, f)?;
        if !self.previous.is_empty() {
            target.notify(&tiles);
        }
        Ok(())
    }

    pub(crate) fn revert(&mut self, target: &EditTarget) -> Result<(), EditError> {
        let layer = match self.layer {
            Some(layer) if !self.previous.is_empty() => layer,
            _ => return Ok(()),
        };
        let tiles = target.document.restore(layer, &self.previous)?;
        target.notify(&tiles);
        Ok(())
    }

    pub(crate) fn previous(&self) -> &PreviousState {
        &self.previous
    }

    pub(crate) fn layer(&self) -> Option<LayerId> {
        self.layer
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeRecord;
    use crate::coordinates::{vertex_copies, CELL_SIZE};
    use crate::history::CommandHistory;
    use crate::test_util::{target, uniform_store, uniform_tile};
    use crate::tile_store::TileStore;
    use crate::units::{VertexUnits, WorldUnits};

    use landblock_core::glam::{IVec2, Vec2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Tiles `[0, 3) × [0, 3)` except (2, 2).
    fn holey_store() -> Arc<TileStore> {
        let tiles = (0..3)
            .flat_map(|x| (0..3).map(move |y| (x, y)))
            .filter(|&c| c != (2, 2))
            .map(|(x, y)| (TileKey::new(x, y).unwrap(), uniform_tile(AttributeRecord::ZERO)));
        Arc::new(TileStore::from_tiles(tiles))
    }

    fn assert_seams_agree(target: &EditTarget, step: usize) {
        target.document.with_state(|state| {
            for x in 0..=24 {
                for y in 0..=24 {
                    let p = VertexUnits(IVec2::new(x, y));
                    let copies: Vec<_> = vertex_copies(p)
                        .into_iter()
                        .filter(|i| state.tiles().contains(i.tile()))
                        .map(|i| state.merged().get(i))
                        .collect();
                    if let Some(first) = copies.first() {
                        assert!(
                            copies.iter().all(|c| c == first),
                            "step {}: copies of {:?} disagree: {:?}",
                            step,
                            p,
                            copies
                        );
                    }
                }
            }
        });
    }

    fn random_command(rng: &mut StdRng, target: &EditTarget) -> Option<TerrainCommand> {
        let command = match rng.gen_range(0..4) {
            0 => {
                let center = Vec2::new(rng.gen_range(0.0..576.0), rng.gen_range(0.0..576.0));
                let scenery = if rng.gen_bool(0.5) {
                    Some(rng.gen_range(0..4))
                } else {
                    None
                };
                PaintCommand::new(
                    WorldUnits(center),
                    WorldUnits(rng.gen_range(10.0..80.0)),
                    rng.gen_range(0..6),
                    scenery,
                )
                .into()
            }
            1 => {
                let vertex = VertexUnits(IVec2::new(rng.gen_range(0..=24), rng.gen_range(0..=24)));
                SetRoadBitCommand::new(vertex, rng.gen_range(0..=3)).into()
            }
            2 => {
                let start = IVec2::new(rng.gen_range(0..=24), rng.gen_range(0..=24));
                let end = IVec2::new(rng.gen_range(0..=24), rng.gen_range(0..=24));
                DrawLineCommand::new(VertexUnits(start), VertexUnits(end), rng.gen_range(0..=3))
                    .into()
            }
            _ => {
                let seed = VertexUnits(IVec2::new(rng.gen_range(0..=24), rng.gen_range(0..=24)));
                target.document.read_vertex(seed)?;
                BucketFillCommand::new(seed, rng.gen_range(0..6), None).into()
            }
        };
        Some(command)
    }

    #[test]
    fn random_edits_keep_shared_vertices_identical() {
        let (target, _) = target(holey_store());
        let mut history = CommandHistory::new(16);
        let mut rng = StdRng::seed_from_u64(0x1a4d);

        for step in 0..200 {
            if rng.gen_bool(0.2) {
                history.undo().unwrap();
            } else if rng.gen_bool(0.1) {
                history.redo().unwrap();
            } else if let Some(command) = random_command(&mut rng, &target) {
                history.execute(&target, command).unwrap();
            }
            assert_seams_agree(&target, step);
        }

        history.jump_to(None).unwrap();
        assert_seams_agree(&target, 200);
    }

    #[test]
    fn random_edits_across_layers_keep_shared_vertices_identical() {
        let (target, _) = target(holey_store());
        let layers = [
            target.document.active_layer(),
            target.document.add_layer("Roads"),
            target.document.add_layer("Detail"),
        ];
        let mut history = CommandHistory::new(16);
        let mut rng = StdRng::seed_from_u64(0x1a7e);

        for step in 0..300 {
            match rng.gen_range(0..10) {
                0 => {
                    let layer = layers[rng.gen_range(0..layers.len())];
                    target.document.set_active_layer(layer).unwrap();
                }
                1 => {
                    let layer = layers[rng.gen_range(0..layers.len())];
                    target.document.set_layer_visible(layer, rng.gen_bool(0.5)).unwrap();
                }
                2 => {
                    let layer = layers[rng.gen_range(0..layers.len())];
                    target.document.move_layer(layer, rng.gen_range(0..layers.len())).unwrap();
                }
                3 => {
                    history.undo().unwrap();
                }
                4 => {
                    history.redo().unwrap();
                }
                _ => {
                    if let Some(command) = random_command(&mut rng, &target) {
                        history.execute(&target, command).unwrap();
                    }
                }
            }
            assert_seams_agree(&target, step);
        }

        for &layer in layers.iter() {
            target.document.set_layer_visible(layer, true).unwrap();
            assert_seams_agree(&target, 300);
        }
        history.jump_to(None).unwrap();
        assert_seams_agree(&target, 301);
    }

    #[test]
    fn hiding_an_upper_layer_keeps_the_seam_consistent() {
        let (target, _) = target(uniform_store(2, 1, AttributeRecord::ZERO));
        let seam = VertexUnits(IVec2::new(8, 4));
        let paint = |texture| {
            let center = WorldUnits(Vec2::new(8.0, 4.0) * CELL_SIZE);
            TerrainCommand::from(PaintCommand::new(center, WorldUnits(1.0), texture, None))
        };
        let seam_textures = || -> Vec<u8> {
            vertex_copies(seam)
                .into_iter()
                .map(|i| target.document.read(i).texture_type)
                .collect()
        };
        let mut history = CommandHistory::new(16);

        let base = target.document.active_layer();
        history.execute(&target, paint(7)).unwrap();
        let top = target.document.add_layer("Top");
        target.document.set_active_layer(top).unwrap();
        history.execute(&target, paint(9)).unwrap();
        target.document.set_active_layer(base).unwrap();
        history.execute(&target, paint(3)).unwrap();
        assert_eq!(seam_textures(), [9, 9]);

        target.document.set_layer_visible(top, false).unwrap();
        assert_eq!(seam_textures(), [3, 3]);

        history.undo().unwrap();
        assert_eq!(seam_textures(), [7, 7]);
        target.document.set_layer_visible(top, true).unwrap();
        assert_eq!(seam_textures(), [9, 9]);
    }

    #[test]
    fn notifications_follow_changes() {
        let (target, observer) = target(holey_store());
        let mut road = SetRoadBitCommand::new(VertexUnits(IVec2::new(8, 8)), 2);
        road.execute(&target).unwrap();
        let keys: Vec<_> = [(0, 0), (0, 1), (1, 0), (1, 1)]
            .iter()
            .map(|&(x, y)| TileKey::new(x, y).unwrap())
            .collect();
        assert_eq!(observer.take_invalidated(), keys);

        road.undo(&target).unwrap();
        assert_eq!(observer.take_invalidated(), keys);
        assert_eq!(observer.changes.load(std::sync::atomic::Ordering::SeqCst), 2);

        // Writing what is already there changes nothing and tells nobody.
        let mut same = SetRoadBitCommand::new(VertexUnits(IVec2::new(8, 8)), 0);
        same.execute(&target).unwrap();
        assert!(TerrainCommand::from(same).is_empty());
        assert!(observer.take_invalidated().is_empty());
        assert_eq!(observer.changes.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
