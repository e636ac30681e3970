use super::{EditRecord, EditTarget};
use crate::attributes::validate_road;
use crate::change_set::{ChangeSet, PreviousState};
use crate::coordinates::in_map_bounds;
use crate::error::EditError;
use crate::layer::LayerId;
use crate::units::VertexUnits;

use landblock_core::geometry::GridLine;
use landblock_core::glam::IVec2;

/// Sets the road bits of every vertex on the grid line between two vertices.
#[derive(Clone, Debug)]
pub struct DrawLineCommand {
    pub start: VertexUnits<IVec2>,
    pub end: VertexUnits<IVec2>,
    pub road: u8,
    record: EditRecord,
}

impl DrawLineCommand {
    pub fn new(start: VertexUnits<IVec2>, end: VertexUnits<IVec2>, road: u8) -> Self {
        Self {
            start,
            end,
            road,
            record: EditRecord::default(),
        }
    }

    /// Moves the end point. Only meaningful while the command isn't applied: undo, move, execute again.
    pub fn set_end(&mut self, end: VertexUnits<IVec2>) {
        self.end = end;
    }

    pub fn execute(&mut self, target: &EditTarget) -> Result<(), EditError> {
        let road = validate_road(self.road)?;
        check_bounds(self.start)?;
        check_bounds(self.end)?;
        let line = GridLine::new(self.start.0, self.end.0);
        self.record.apply(target, |changes| {
            for p in line {
                set_road(changes, VertexUnits(p), road);
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

/// Sets the road bits of a single vertex.
#[derive(Clone, Debug)]
pub struct SetRoadBitCommand {
    pub vertex: VertexUnits<IVec2>,
    pub road: u8,
    record: EditRecord,
}

impl SetRoadBitCommand {
    pub fn new(vertex: VertexUnits<IVec2>, road: u8) -> Self {
        Self {
            vertex,
            road,
            record: EditRecord::default(),
        }
    }

    pub fn execute(&mut self, target: &EditTarget) -> Result<(), EditError> {
        let road = validate_road(self.road)?;
        check_bounds(self.vertex)?;
        let vertex = self.vertex;
        self.record
            .apply(target, |changes| set_road(changes, vertex, road))
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

fn check_bounds(p: VertexUnits<IVec2>) -> Result<(), EditError> {
    if !in_map_bounds(p) {
        return Err(EditError::VertexOutOfBounds { x: p.0.x, y: p.0.y });
    }
    Ok(())
}

fn set_road(changes: &mut ChangeSet, p: VertexUnits<IVec2>, road: u8) {
    if let Some(owner) = changes.state().owner(p) {
        let current = changes.current(owner);
        if current.road != road {
            changes.write(owner, current.with_road(road));
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
