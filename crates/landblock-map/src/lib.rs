//! The landblock terrain data model and editing engine.
//!
//! # Tiles
//!
//! The map is a grid of up to 255 × 255 tiles. Each tile stores a 9 × 9 array of [`AttributeRecord`]s, one per vertex, so
//! neighboring tiles each hold their own copy of the vertices along their shared edge. Base tile data comes from a
//! [`TileSource`] and is never modified after the [`TileStore`] is populated.
//!
//! # Layers
//!
//! Edits are written as sparse overrides into a [`LayerStack`]. The merged view of a vertex is the override of the
//! topmost visible layer that has one, else the base tile value. A [`MergedCache`] holds the merged records of every tile
//! and is updated incrementally after every change.
//!
//! # Seams
//!
//! Every committed edit also writes the other copies of the vertices it touched, so that all copies of a shared vertex
//! resolve to the same record. See [`writes_for_vertices`].
//!
//! # Documents
//!
//! A [`TerrainDocument`] owns the layers and merged cache for one map. Documents are opened once through a
//! [`DocumentRegistry`] and saved in the background by a [`PersistencePipeline`] into a [`DocumentStore`].

mod attributes;
mod boundary;
mod change_set;
mod config;
mod coordinates;
mod database;
mod edit;
mod error;
mod history;
mod layer;
mod merge;
mod persistence;
mod projection;
mod terrain;
mod tile_store;
mod units;

#[cfg(test)]
mod test_util;

pub use attributes::*;
pub use boundary::*;
pub use change_set::*;
pub use config::*;
pub use coordinates::*;
pub use database::*;
pub use edit::*;
pub use error::*;
pub use history::*;
pub use layer::*;
pub use merge::*;
pub use persistence::*;
pub use projection::*;
pub use terrain::*;
pub use tile_store::*;
pub use units::*;
