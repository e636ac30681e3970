use super::Raycaster;

use landblock_map::BucketFillCommand;

/// Flood fills from the vertex under the pointer.
#[derive(Clone, Copy, Debug)]
pub struct FillTool {
    pub texture: u8,
    pub scenery: Option<u8>,
    /// Fill only what is connected to the clicked vertex, rather than every matching vertex on the map.
    pub contiguous: bool,
    pub only_same_scenery: bool,
}

impl FillTool {
    pub fn new(texture: u8) -> Self {
        Self {
            texture,
            scenery: None,
            contiguous: true,
            only_same_scenery: false,
        }
    }

    /// The fill to run for a click at `(x, y)`, if it hit the terrain.
    pub fn click(&self, raycaster: &dyn Raycaster, x: f32, y: f32) -> Option<BucketFillCommand> {
        let seed = raycaster.screen_to_world_hit(x, y)?.vertex();
        let mut fill = BucketFillCommand::new(seed, self.texture, self.scenery);
        if !self.contiguous {
            fill = fill.global();
        }
        if self.only_same_scenery {
            fill = fill.only_same_scenery();
        }
        Some(fill)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
