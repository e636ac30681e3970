use super::Raycaster;

use landblock_map::{DrawLineCommand, EditError, EditTarget};

/// Draws a straight road between where the pointer went down and where it is released, previewing it on the terrain
/// in between.
#[derive(Debug)]
pub struct LineTool {
    pub road: u8,
    preview: Option<DrawLineCommand>,
}

impl LineTool {
    pub fn new(road: u8) -> Self {
        Self {
            road,
            preview: None,
        }
    }

    pub fn is_previewing(&self) -> bool {
        self.preview.is_some()
    }

    pub fn pointer_down(
        &mut self,
        target: &EditTarget,
        raycaster: &dyn Raycaster,
        x: f32,
        y: f32,
    ) -> Result<(), EditError> {
        let start = match raycaster.screen_to_world_hit(x, y) {
            Some(hit) => hit.vertex(),
            None => return Ok(()),
        };
        self.cancel(target)?;
        let mut line = DrawLineCommand::new(start, start, self.road);
        line.execute(target)?;
        self.preview = Some(line);
        Ok(())
    }

    /// Redraws the preview to end under the pointer.
    pub fn pointer_move(
        &mut self,
        target: &EditTarget,
        raycaster: &dyn Raycaster,
        x: f32,
        y: f32,
    ) -> Result<(), EditError> {
        let (line, end) = match (&mut self.preview, raycaster.screen_to_world_hit(x, y)) {
            (Some(line), Some(hit)) => (line, hit.vertex()),
            _ => return Ok(()),
        };
        if line.end == end {
            return Ok(());
        }
        line.undo(target)?;
        line.set_end(end);
        line.execute(target)
    }

    /// Keeps the last preview. Returns it if it changed anything.
    pub fn commit(&mut self) -> Option<DrawLineCommand> {
        self.preview
            .take()
            .filter(|line| !line.previous().is_empty())
    }

    /// Removes the preview from the terrain.
    pub fn cancel(&mut self, target: &EditTarget) -> Result<(), EditError> {
        match self.preview.take() {
            Some(mut line) => line.undo(target),
            None => Ok(()),
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
