use super::{Raycaster, StrokeState};

use landblock_core::glam::IVec2;
use landblock_map::{CompoundCommand, EditError, EditTarget, SetRoadBitCommand, VertexUnits};

/// Sets the road bits of each vertex the pointer passes over while held down.
#[derive(Debug)]
pub struct RoadTool {
    pub road: u8,
    state: StrokeState,
    last: Option<VertexUnits<IVec2>>,
}

impl RoadTool {
    pub fn new(road: u8) -> Self {
        Self {
            road,
            state: StrokeState::Idle,
            last: None,
        }
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

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
        self.state.begin("Road stroke");
        self.last = None;
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
        let vertex = match raycaster.screen_to_world_hit(x, y) {
            Some(hit) => hit.vertex(),
            None => return Ok(()),
        };
        if self.last == Some(vertex) {
            return Ok(());
        }
        self.last = Some(vertex);
        self.state
            .apply(target, SetRoadBitCommand::new(vertex, self.road))
    }

    pub fn pointer_up(&mut self) -> Option<CompoundCommand> {
        self.last = None;
        self.state.finish()
    }

    pub fn cancel(&mut self, target: &EditTarget) -> Result<(), EditError> {
        self.last = None;
        self.state.cancel(target)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
