use super::{EditRecord, EditTarget};
use crate::attributes::AttributeRecord;
use crate::change_set::{ChangeSet, PreviousState};
use crate::coordinates::{in_map_bounds, vertex_copies, GlobalVertexIndex};
use crate::error::EditError;
use crate::layer::LayerId;
use crate::units::VertexUnits;

use landblock_core::glam::IVec2;
use landblock_core::SmallKeyHashSet;
use std::collections::VecDeque;

/// Replaces the texture (and optionally the scenery) of every vertex that matches the seed vertex.
#[derive(Clone, Debug)]
pub struct BucketFillCommand {
    pub seed: VertexUnits<IVec2>,
    pub texture: u8,
    pub scenery: Option<u8>,
    /// Only fill the 4-connected region around the seed. Otherwise every matching vertex in the map is filled.
    pub contiguous: bool,
    /// Also require the seed's scenery to match.
    pub only_same_scenery: bool,
    record: EditRecord,
}

impl BucketFillCommand {
    pub fn new(seed: VertexUnits<IVec2>, texture: u8, scenery: Option<u8>) -> Self {
        Self {
            seed,
            texture,
            scenery,
            contiguous: true,
            only_same_scenery: false,
            record: EditRecord::default(),
        }
    }

    pub fn global(mut self) -> Self {
        self.contiguous = false;
        self
    }

    pub fn only_same_scenery(mut self) -> Self {
        self.only_same_scenery = true;
        self
    }

    pub fn execute(&mut self, target: &EditTarget) -> Result<(), EditError> {
        if !in_map_bounds(self.seed) {
            return Err(EditError::VertexOutOfBounds {
                x: self.seed.0.x,
                y: self.seed.0.y,
            });
        }
        let seed_record = target
            .document
            .read_vertex(self.seed)
            .ok_or_else(|| missing_tile(self.seed))?;
        let scenery_changes = matches!(self.scenery, Some(s) if s != seed_record.scenery);
        if seed_record.texture_type == self.texture && !scenery_changes {
            self.record = EditRecord::default();
            return Ok(());
        }

        let fill = Fill {
            seed_record,
            texture: self.texture,
            scenery: self.scenery,
            only_same_scenery: self.only_same_scenery,
        };
        let (seed, contiguous) = (self.seed, self.contiguous);
        self.record.apply(target, |changes| {
            let targets = if contiguous {
                fill.contiguous_region(changes, seed)
            } else {
                fill.all_matching(changes)
            };
            for owner in targets {
                let current = changes.current(owner);
                changes.write(owner, fill.apply(current));
            }
        })
    }

    pub fn undo(&mut self, target: &EditTarget) -> Result<(), EditError> {
        self.record.revert(target)
    }

    pub fn previous(&self) -> &PreviousState {
        self.record.previous()
    }

    /// The layer this command was pinned to when it first ran.
    pub fn layer(&self) -> Option<LayerId> {
        self.record.layer()
    }
}

fn missing_tile(p: VertexUnits<IVec2>) -> EditError {
    match vertex_copies(p).first() {
        Some(copy) => EditError::MissingTile(copy.tile()),
        None => EditError::VertexOutOfBounds { x: p.0.x, y: p.0.y },
    }
}

struct Fill {
    seed_record: AttributeRecord,
    texture: u8,
    scenery: Option<u8>,
    only_same_scenery: bool,
}

impl Fill {
    fn matches(&self, record: AttributeRecord) -> bool {
        record.texture_type == self.seed_record.texture_type
            && (!self.only_same_scenery || record.scenery == self.seed_record.scenery)
    }

    fn apply(&self, record: AttributeRecord) -> AttributeRecord {
        let filled = record.with_texture(self.texture);
        match self.scenery {
            Some(scenery) => filled.with_scenery(scenery),
            None => filled,
        }
    }

    /// Breadth-first over global vertex positions. Each position is visited once and yields its owning copy.
    fn contiguous_region(
        &self,
        changes: &ChangeSet,
        seed: VertexUnits<IVec2>,
    ) -> Vec<GlobalVertexIndex> {
        const STEPS: [IVec2; 4] = [
            IVec2::new(1, 0),
            IVec2::new(-1, 0),
            IVec2::new(0, 1),
            IVec2::new(0, -1),
        ];

        let mut region = Vec::new();
        let mut visited = SmallKeyHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(seed.0);
        queue.push_back(seed.0);
        while let Some(p) = queue.pop_front() {
            let owner = match changes.state().owner(VertexUnits(p)) {
                Some(owner) if self.matches(changes.current(owner)) => owner,
                _ => continue,
            };
            region.push(owner);
            for step in STEPS {
                let next = p + step;
                if in_map_bounds(VertexUnits(next)) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        region
    }

    /// Every matching vertex of every existing tile, counting shared vertices once.
    fn all_matching(&self, changes: &ChangeSet) -> Vec<GlobalVertexIndex> {
        let state = changes.state();
        let mut keys: Vec<_> = state.tiles().keys().collect();
        keys.sort_unstable();

        let mut out = Vec::new();
        for key in keys {
            for index in key.vertices() {
                if state.owner(index.position()) == Some(index)
                    && self.matches(changes.current(index))
                {
                    out.push(index);
                }
            }
        }
        out
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
