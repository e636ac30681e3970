use super::{Raycaster, StrokeState};

use landblock_map::{CompoundCommand, EditError, EditTarget, PaintCommand, WorldUnits};

/// Paints a texture in a circle under the pointer while it is held down.
#[derive(Debug)]
pub struct BrushTool {
    pub radius: WorldUnits<f32>,
    pub texture: u8,
    pub scenery: Option<u8>,
    state: StrokeState,
}

impl BrushTool {
    pub fn new(radius: WorldUnits<f32>, texture: u8, scenery: Option<u8>) -> Self {
        Self {
            radius,
            texture,
            scenery,
            state: StrokeState::Idle,
        }
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

    /// Starts a stroke if the pointer is over the terrain.
    pub fn pointer_down(
        &mut self,
        target: &EditTarget,
        raycaster: &dyn Raycaster,
        x: f32,
        y: f32,
    ) -> Result<(), EditError> {
        if raycaster.screen_to_world_hit(x, y).is_none() {
            return Ok(());
        }
        self.state.begin("Brush stroke");
        self.pointer_move(target, raycaster, x, y)
    }

    pub fn pointer_move(
        &mut self,
        target: &EditTarget,
        raycaster: &dyn Raycaster,
        x: f32,
        y: f32,
    ) -> Result<(), EditError> {
        if !self.state.is_painting() {
            return Ok(());
        }
        let hit = match raycaster.screen_to_world_hit(x, y) {
            Some(hit) => hit,
            None => return Ok(()),
        };
        let paint = PaintCommand::new(hit.position, self.radius, self.texture, self.scenery);
        self.state.apply(target, paint)
    }

    /// Ends the stroke. Returns it as one command if it changed anything.
    pub fn pointer_up(&mut self) -> Option<CompoundCommand> {
        self.state.finish()
    }

    pub fn cancel(&mut self, target: &EditTarget) -> Result<(), EditError> {
        self.state.cancel(target)
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
    use crate::test_util::{target, uniform_store, FlatRaycaster};

    use landblock_core::glam::IVec2;
    use landblock_map::{AttributeRecord, TerrainCommand, VertexUnits};

    fn texture_at(target: &EditTarget, x: i32, y: i32) -> u8 {
        target
            .document
            .read_vertex(VertexUnits(IVec2::new(x, y)))
            .unwrap()
            .texture_type
    }

    #[test]
    fn stroke_becomes_one_command() {
        let target = target(uniform_store(2, 2, AttributeRecord::ZERO));
        let mut brush = BrushTool::new(WorldUnits(20.0), 3, None);

        brush.pointer_down(&target, &FlatRaycaster, 48.0, 48.0).unwrap();
        assert!(brush.state().is_painting());
        brush.pointer_move(&target, &FlatRaycaster, 96.0, 48.0).unwrap();
        brush.pointer_move(&target, &FlatRaycaster, -5.0, 48.0).unwrap();
        brush.pointer_move(&target, &FlatRaycaster, 144.0, 48.0).unwrap();
        let stroke = brush.pointer_up().unwrap();
        assert!(!brush.state().is_painting());
        assert_eq!(stroke.len(), 3);
        assert_eq!((texture_at(&target, 2, 2), texture_at(&target, 6, 2)), (3, 3));

        let mut command = TerrainCommand::from(stroke);
        command.undo(&target).unwrap();
        assert_eq!((texture_at(&target, 2, 2), texture_at(&target, 6, 2)), (0, 0));
    }

    #[test]
    fn missed_pointer_down_does_not_start() {
        let target = target(uniform_store(1, 1, AttributeRecord::ZERO));
        let mut brush = BrushTool::new(WorldUnits(20.0), 3, None);
        brush.pointer_down(&target, &FlatRaycaster, -1.0, 0.0).unwrap();
        brush.pointer_move(&target, &FlatRaycaster, 48.0, 48.0).unwrap();
        assert!(brush.pointer_up().is_none());
        assert_eq!(texture_at(&target, 2, 2), 0);
    }

    #[test]
    fn repainting_the_same_spot_adds_nothing() {
        let target = target(uniform_store(1, 1, AttributeRecord::ZERO));
        let mut brush = BrushTool::new(WorldUnits(20.0), 3, None);
        brush.pointer_down(&target, &FlatRaycaster, 48.0, 48.0).unwrap();
        brush.pointer_move(&target, &FlatRaycaster, 48.0, 48.0).unwrap();
        assert_eq!(brush.pointer_up().unwrap().len(), 1);

        brush.pointer_down(&target, &FlatRaycaster, 48.0, 48.0).unwrap();
        assert!(brush.pointer_up().is_none());
    }

    #[test]
    fn cancel_undoes_the_stroke() {
        let target = target(uniform_store(1, 1, AttributeRecord::ZERO));
        let mut brush = BrushTool::new(WorldUnits(20.0), 3, Some(1));
        brush.pointer_down(&target, &FlatRaycaster, 48.0, 48.0).unwrap();
        brush.cancel(&target).unwrap();
        assert_eq!(texture_at(&target, 2, 2), 0);
        assert!(brush.pointer_up().is_none());
    }
}
