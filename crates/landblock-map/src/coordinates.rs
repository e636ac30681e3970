use crate::attributes::{TILE_EDGE_VERTICES, TILE_VERTICES};
use crate::units::{VertexUnits, WorldUnits};

use landblock_core::geometry::GridExtent;
use landblock_core::glam::{IVec2, Vec2};
use smallvec::SmallVec;
use std::fmt;

/// Largest valid tile coordinate on either axis.
pub const MAX_TILE_COORD: u8 = 254;
/// Cells (not vertices) along one edge of a tile.
pub const TILE_EDGE_CELLS: i32 = 8;
/// World units spanned by one cell.
pub const CELL_SIZE: f32 = 24.0;
/// World units spanned by one tile.
pub const TILE_SIZE: f32 = CELL_SIZE * TILE_EDGE_CELLS as f32;
/// Global vertex coordinates on either axis are in `[0, MAP_EDGE_VERTICES)`.
pub const MAP_EDGE_VERTICES: i32 = (MAX_TILE_COORD as i32 + 1) * TILE_EDGE_CELLS + 1;

/// `(tile_x << 8) | tile_y`, both in `[0, 254]`.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TileKey(u16);

impl TileKey {
    pub fn new(tile_x: u8, tile_y: u8) -> Option<Self> {
        (tile_x <= MAX_TILE_COORD && tile_y <= MAX_TILE_COORD)
            .then(|| Self((tile_x as u16) << 8 | tile_y as u16))
    }

    pub fn from_coords(coords: IVec2) -> Option<Self> {
        let range = 0..=MAX_TILE_COORD as i32;
        (range.contains(&coords.x) && range.contains(&coords.y))
            .then(|| Self((coords.x as u16) << 8 | coords.y as u16))
    }

    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::new((raw >> 8) as u8, raw as u8)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    pub const fn x(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn y(self) -> u8 {
        self.0 as u8
    }

    pub fn coords(self) -> IVec2 {
        IVec2::new(self.x() as i32, self.y() as i32)
    }

    pub fn neighbor(self, offset: IVec2) -> Option<Self> {
        Self::from_coords(self.coords() + offset)
    }

    /// Global vertex coordinates of local vertex `(0, 0)`.
    pub fn vertex_origin(self) -> VertexUnits<IVec2> {
        VertexUnits(self.coords() * TILE_EDGE_CELLS)
    }

    /// Every global index in this tile, in [`VertexIndex`] order.
    pub fn vertices(self) -> impl Iterator<Item = GlobalVertexIndex> {
        VertexIndex::all().map(move |v| GlobalVertexIndex::new(self, v))
    }
}

impl fmt::Debug for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileKey({}, {})", self.x(), self.y())
    }
}

/// Index of a vertex within one tile: `x * 9 + y`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VertexIndex(u8);

impl VertexIndex {
    pub fn new(x: u8, y: u8) -> Option<Self> {
        let edge = TILE_EDGE_VERTICES as u8;
        (x < edge && y < edge).then(|| Self(x * edge + y))
    }

    pub fn from_offset(offset: IVec2) -> Option<Self> {
        let range = 0..TILE_EDGE_VERTICES as i32;
        (range.contains(&offset.x) && range.contains(&offset.y))
            .then(|| Self((offset.x * TILE_EDGE_VERTICES as i32 + offset.y) as u8))
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        ((raw as usize) < TILE_VERTICES).then(|| Self(raw))
    }

    pub const fn into_raw(self) -> u8 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn x(self) -> u8 {
        self.0 / TILE_EDGE_VERTICES as u8
    }

    pub const fn y(self) -> u8 {
        self.0 % TILE_EDGE_VERTICES as u8
    }

    pub fn offset(self) -> IVec2 {
        IVec2::new(self.x() as i32, self.y() as i32)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..TILE_VERTICES as u8).map(Self)
    }
}

/// `tile_key * 81 + vertex_index`: one tile's copy of a vertex.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct GlobalVertexIndex(u32);

impl GlobalVertexIndex {
    pub fn new(tile: TileKey, vertex: VertexIndex) -> Self {
        Self(tile.into_raw() as u32 * TILE_VERTICES as u32 + vertex.into_raw() as u32)
    }

    /// Rejects indices whose tile coordinates are out of range.
    pub fn from_raw(raw: u32) -> Option<Self> {
        let tile = raw / TILE_VERTICES as u32;
        let tile = TileKey::from_raw(u16::try_from(tile).ok()?)?;
        Some(Self::new(
            tile,
            VertexIndex((raw % TILE_VERTICES as u32) as u8),
        ))
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    pub fn tile(self) -> TileKey {
        TileKey((self.0 / TILE_VERTICES as u32) as u16)
    }

    pub fn vertex(self) -> VertexIndex {
        VertexIndex((self.0 % TILE_VERTICES as u32) as u8)
    }

    pub fn position(self) -> VertexUnits<IVec2> {
        VertexUnits(self.tile().vertex_origin().0 + self.vertex().offset())
    }
}

impl fmt::Debug for GlobalVertexIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}[{}, {}]", self.tile(), self.vertex().x(), self.vertex().y())
    }
}

/// Every global vertex position on the map.
pub fn map_extent() -> GridExtent {
    GridExtent::from_min_and_max(IVec2::ZERO, IVec2::splat(MAP_EDGE_VERTICES - 1))
}

pub fn in_map_bounds(p: VertexUnits<IVec2>) -> bool {
    map_extent().contains(p.0)
}

/// Rounds a world position to the nearest global vertex.
pub fn snap_to_vertex(p: WorldUnits<Vec2>) -> VertexUnits<IVec2> {
    VertexUnits((p.0 / CELL_SIZE).round().as_ivec2())
}

pub fn vertex_to_world(p: VertexUnits<IVec2>) -> WorldUnits<Vec2> {
    WorldUnits(p.0.as_vec2() * CELL_SIZE)
}

/// Tile coordinates on one axis whose vertex range contains `g`, in canonical order.
fn tile_candidates_1d(g: i32) -> SmallVec<[i32; 2]> {
    let mut out = SmallVec::new();
    let t = g.div_euclid(TILE_EDGE_CELLS);
    if (0..=MAX_TILE_COORD as i32).contains(&t) {
        out.push(t);
    }
    if g.rem_euclid(TILE_EDGE_CELLS) == 0 && (1..=MAX_TILE_COORD as i32 + 1).contains(&t) {
        out.push(t - 1);
    }
    out
}

/// Every tile copy of the global vertex at `p`, whether or not those tiles exist. Interior vertices have one copy, edge
/// vertices two and corner vertices four.
///
/// The order is canonical: the first entry whose tile exists is the vertex's owner.
pub fn vertex_copies(p: VertexUnits<IVec2>) -> SmallVec<[GlobalVertexIndex; 4]> {
    let mut out = SmallVec::new();
    if !in_map_bounds(p) {
        return out;
    }
    for tx in tile_candidates_1d(p.0.x) {
        for ty in tile_candidates_1d(p.0.y) {
            let tile = TileKey((tx as u16) << 8 | ty as u16);
            let local = p.0 - IVec2::new(tx, ty) * TILE_EDGE_CELLS;
            out.push(GlobalVertexIndex::new(
                tile,
                VertexIndex((local.x * TILE_EDGE_VERTICES as i32 + local.y) as u8),
            ));
        }
    }
    out
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
