use super::{EditRecord, EditTarget};
use crate::change_set::PreviousState;
use crate::coordinates::{map_extent, CELL_SIZE};
use crate::error::EditError;
use crate::layer::LayerId;
use crate::units::{VertexUnits, WorldUnits};

use landblock_core::geometry::Circle;
use landblock_core::glam::Vec2;

/// Sets the texture (and optionally the scenery) of every vertex within `radius` of `center`.
#[derive(Clone, Debug)]
pub struct PaintCommand {
    pub center: WorldUnits<Vec2>,
    pub radius: WorldUnits<f32>,
    pub texture: u8,
    pub scenery: Option<u8>,
    record: EditRecord,
}

impl PaintCommand {
    pub fn new(
        center: WorldUnits<Vec2>,
        radius: WorldUnits<f32>,
        texture: u8,
        scenery: Option<u8>,
    ) -> Self {
        Self {
            center,
            radius,
            texture,
            scenery,
            record: EditRecord::default(),
        }
    }

    pub fn execute(&mut self, target: &EditTarget) -> Result<(), EditError> {
        let radius = self.radius.into_inner();
        if !radius.is_finite() || radius < 0.0 || !self.center.0.is_finite() {
            return Err(EditError::InvalidRadius(radius));
        }
        let circle = Circle::new(self.center.0 / CELL_SIZE, radius / CELL_SIZE);
        let extent = circle.grid_extent().intersection(&map_extent());
        let (texture, scenery) = (self.texture, self.scenery);

        self.record.apply(target, |changes| {
            for p in extent.iter2() {
                if !circle.contains(p.as_vec2()) {
                    continue;
                }
                let owner = match changes.state().owner(VertexUnits(p)) {
                    Some(owner) => owner,
                    None => continue,
                };
                let current = changes.current(owner);
                let mut painted = current.with_texture(texture);
                if let Some(scenery) = scenery {
                    painted = painted.with_scenery(scenery);
                }
                if painted != current {
                    changes.write(owner, painted);
                }
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

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
