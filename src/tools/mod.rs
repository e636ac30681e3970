//! Pointer-driven editing tools.
//!
//! Tools turn screen-space pointer input into terrain commands. Drag tools apply their edits while the pointer moves and
//! hand back one finished command when it is released, ready for [`EditorSession::record`](crate::EditorSession::record).
//! Click tools hand back an unapplied command for [`EditorSession::execute`](crate::EditorSession::execute).

mod brush;
mod fill;
mod line;
mod road;
mod stroke;

pub use brush::BrushTool;
pub use fill::FillTool;
pub use line::LineTool;
pub use road::RoadTool;
pub use stroke::StrokeState;

use landblock_core::glam::{IVec2, Vec2};
use landblock_map::{snap_to_vertex, AttributeRecord, TerrainDocument, VertexUnits, WorldUnits};

/// Where a screen-space ray met the terrain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldHit {
    pub position: WorldUnits<Vec2>,
}

impl WorldHit {
    pub fn new(position: WorldUnits<Vec2>) -> Self {
        Self { position }
    }

    /// The nearest vertex.
    pub fn vertex(&self) -> VertexUnits<IVec2> {
        snap_to_vertex(self.position)
    }
}

/// Casts rays from the screen into the terrain.
pub trait Raycaster {
    fn screen_to_world_hit(&self, x: f32, y: f32) -> Option<WorldHit>;
}

/// The merged record under the pointer.
pub fn sample(
    document: &TerrainDocument,
    raycaster: &dyn Raycaster,
    x: f32,
    y: f32,
) -> Option<AttributeRecord> {
    let hit = raycaster.screen_to_world_hit(x, y)?;
    document.read_vertex(hit.vertex())
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
    use crate::test_util::{target, uniform_store, FlatRaycaster};

    #[test]
    fn sample_reads_the_snapped_vertex() {
        let record = AttributeRecord::ZERO.with_texture(4);
        let target = target(uniform_store(1, 1, record));
        assert_eq!(sample(&target.document, &FlatRaycaster, 35.0, 13.0), Some(record));
        assert_eq!(sample(&target.document, &FlatRaycaster, -1.0, 0.0), None);
        // Inside the map but no tile there.
        assert_eq!(sample(&target.document, &FlatRaycaster, 1000.0, 1000.0), None);
    }

    #[test]
    fn hits_snap_to_the_nearest_vertex() {
        let hit = WorldHit::new(WorldUnits(Vec2::new(35.0, 37.0)));
        assert_eq!(hit.vertex(), VertexUnits(IVec2::new(1, 2)));
    }
}
