use crate::error::EditError;

use bytemuck::{Pod, Zeroable};
use landblock_core::static_assertions::const_assert_eq;
use std::mem;

/// Number of vertices along one edge of a tile.
pub const TILE_EDGE_VERTICES: usize = 9;
/// Number of vertices in one tile.
pub const TILE_VERTICES: usize = TILE_EDGE_VERTICES * TILE_EDGE_VERTICES;

/// The largest value a road field may hold. Only the lowest two bits are used.
pub const MAX_ROAD: u8 = 0b11;

/// The attributes stored at every vertex of a tile.
///
/// Packs into a `u32` as `road | scenery << 8 | texture_type << 16 | height_index << 24`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(C)]
pub struct AttributeRecord {
    pub road: u8,
    pub scenery: u8,
    pub texture_type: u8,
    pub height_index: u8,
}

unsafe impl Zeroable for AttributeRecord {}
unsafe impl Pod for AttributeRecord {}

const_assert_eq!(mem::size_of::<AttributeRecord>(), 4);

impl AttributeRecord {
    pub const ZERO: Self = Self {
        road: 0,
        scenery: 0,
        texture_type: 0,
        height_index: 0,
    };

    pub const fn from_u32(packed: u32) -> Self {
        Self {
            road: packed as u8,
            scenery: (packed >> 8) as u8,
            texture_type: (packed >> 16) as u8,
            height_index: (packed >> 24) as u8,
        }
    }

    pub const fn to_u32(self) -> u32 {
        self.road as u32
            | (self.scenery as u32) << 8
            | (self.texture_type as u32) << 16
            | (self.height_index as u32) << 24
    }

    pub fn with_texture(mut self, texture_type: u8) -> Self {
        self.texture_type = texture_type;
        self
    }

    pub fn with_scenery(mut self, scenery: u8) -> Self {
        self.scenery = scenery;
        self
    }

    pub fn with_road(mut self, road: u8) -> Self {
        self.road = road;
        self
    }
}

impl From<u32> for AttributeRecord {
    fn from(packed: u32) -> Self {
        Self::from_u32(packed)
    }
}

impl From<AttributeRecord> for u32 {
    fn from(record: AttributeRecord) -> Self {
        record.to_u32()
    }
}

/// All records of one tile, indexed by [`VertexIndex`](crate::VertexIndex).
pub type TileAttributes = [AttributeRecord; TILE_VERTICES];

pub const EMPTY_TILE: TileAttributes = [AttributeRecord::ZERO; TILE_VERTICES];

/// Copies `records` into a [`TileAttributes`] array, rejecting any slice that isn't exactly one tile long.
pub fn tile_from_slice(records: &[AttributeRecord]) -> Result<TileAttributes, EditError> {
    let mut tile = EMPTY_TILE;
    if records.len() != TILE_VERTICES {
        return Err(EditError::WrongLength {
            expected: TILE_VERTICES,
            actual: records.len(),
        });
    }
    tile.copy_from_slice(records);
    Ok(tile)
}

pub fn validate_road(road: u8) -> Result<u8, EditError> {
    if road > MAX_ROAD {
        return Err(EditError::InvalidRoadBits(road));
    }
    Ok(road)
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packing_is_byte_exact() {
        let record = AttributeRecord {
            road: 0x02,
            scenery: 0x1f,
            texture_type: 0x0c,
            height_index: 0xa7,
        };
        assert_eq!(record.to_u32(), 0xa70c1f02);
        assert_eq!(AttributeRecord::from_u32(0xa70c1f02), record);
        assert_eq!(AttributeRecord::from(u32::MAX).to_u32(), u32::MAX);
        assert_eq!(u32::from(AttributeRecord::ZERO), 0);
    }

    #[test]
    fn bytes_are_in_packing_order() {
        let record = AttributeRecord {
            road: 1,
            scenery: 2,
            texture_type: 3,
            height_index: 4,
        };
        assert_eq!(bytemuck::bytes_of(&record), &[1, 2, 3, 4]);
        assert_eq!(u32::from_le_bytes([1, 2, 3, 4]), record.to_u32());
    }

    #[test]
    fn tile_slice_length_is_checked() {
        let records = vec![AttributeRecord::ZERO.with_texture(3); TILE_VERTICES];
        let tile = tile_from_slice(&records).unwrap();
        assert!(tile.iter().all(|r| r.texture_type == 3));

        assert_eq!(
            tile_from_slice(&records[1..]),
            Err(EditError::WrongLength {
                expected: 81,
                actual: 80
            })
        );
    }

    #[test]
    fn road_bits_are_bounded() {
        assert_eq!(validate_road(3), Ok(3));
        assert_eq!(validate_road(4), Err(EditError::InvalidRoadBits(4)));
    }
}
