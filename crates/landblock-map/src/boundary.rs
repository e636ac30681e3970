//! Keeps the copies of a shared vertex identical across neighboring tiles.
//!
//! Tiles are 9×9 vertices over 8×8 cells, so a tile shares a full edge (9 vertices) with each side neighbor and a single
//! corner vertex with each diagonal neighbor. After a tile changes, the synchronizer compares the changed tile's records at
//! those shared vertices with what each existing neighbor currently resolves to, and emits a write wherever they differ. It
//! never writes into the changed tile itself.

use crate::attributes::{AttributeRecord, TileAttributes, TILE_EDGE_VERTICES};
use crate::coordinates::{GlobalVertexIndex, TileKey, VertexIndex, TILE_EDGE_CELLS};

use landblock_core::glam::IVec2;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Tile offset of the neighbor in this direction. `+x` is east, `+y` is north.
    pub fn offset(self) -> IVec2 {
        match self {
            Self::North => IVec2::new(0, 1),
            Self::NorthEast => IVec2::new(1, 1),
            Self::East => IVec2::new(1, 0),
            Self::SouthEast => IVec2::new(1, -1),
            Self::South => IVec2::new(0, -1),
            Self::SouthWest => IVec2::new(-1, -1),
            Self::West => IVec2::new(-1, 0),
            Self::NorthWest => IVec2::new(-1, 1),
        }
    }

    /// Whether the local vertex `v` is shared with the neighbor in this direction.
    pub fn shares(self, v: VertexIndex) -> bool {
        let on_side = |d: i32, c: u8| match d {
            -1 => c == 0,
            1 => c as usize == TILE_EDGE_VERTICES - 1,
            _ => true,
        };
        let o = self.offset();
        on_side(o.x, v.x()) && on_side(o.y, v.y())
    }

    /// The local index in the neighbor's tile of the shared vertex `v`.
    pub fn neighbor_vertex(self, v: VertexIndex) -> Option<VertexIndex> {
        VertexIndex::from_offset(v.offset() - self.offset() * TILE_EDGE_CELLS)
    }

    /// Directions of every neighbor that shares `v`: none for interior vertices, one on an edge and three at a corner.
    pub fn sharing(v: VertexIndex) -> SmallVec<[Self; 3]> {
        Self::ALL.iter().copied().filter(|d| d.shares(v)).collect()
    }
}

/// An extra override needed in a neighbor tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BoundaryWrite {
    pub index: GlobalVertexIndex,
    pub record: AttributeRecord,
}

/// Computes writes for the vertices of `source` in `changed`, using `data` (the source tile's records after the change).
///
/// `exists` says whether a neighbor tile exists and `current` returns what a neighbor copy holds in whatever view is
/// being synchronized. `None` (no override in a layer view) always differs from the source record.
pub fn writes_for_vertices(
    source: TileKey,
    data: &TileAttributes,
    changed: impl IntoIterator<Item = VertexIndex>,
    exists: impl Fn(TileKey) -> bool,
    mut current: impl FnMut(GlobalVertexIndex) -> Option<AttributeRecord>,
) -> Vec<BoundaryWrite> {
    let mut neighbors: SmallVec<[Option<TileKey>; 8]> = SmallVec::new();
    for d in Direction::ALL {
        neighbors.push(source.neighbor(d.offset()).filter(|&n| exists(n)));
    }

    let mut writes = Vec::new();
    for v in changed {
        let record = data[v.as_usize()];
        for (d, neighbor) in Direction::ALL.iter().zip(neighbors.iter()) {
            let neighbor = match neighbor {
                Some(n) if d.shares(v) => *n,
                _ => continue,
            };
            if let Some(nv) = d.neighbor_vertex(v) {
                let index = GlobalVertexIndex::new(neighbor, nv);
                if current(index) != Some(record) {
                    writes.push(BoundaryWrite { index, record });
                }
            }
        }
    }
    writes
}

/// Like [`writes_for_vertices`] for every border vertex of `source`.
pub fn writes_for_tile(
    source: TileKey,
    data: &TileAttributes,
    exists: impl Fn(TileKey) -> bool,
    current: impl FnMut(GlobalVertexIndex) -> Option<AttributeRecord>,
) -> Vec<BoundaryWrite> {
    let last = TILE_EDGE_VERTICES as u8 - 1;
    let border = VertexIndex::all().filter(|v| {
        v.x() == 0 || v.y() == 0 || v.x() == last || v.y() == last
    });
    writes_for_vertices(source, data, border, exists, current)
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
