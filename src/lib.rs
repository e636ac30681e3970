//! An editor-side layer over [`landblock_map`]: configuration, pointer tools and an [`EditorSession`] that ties the undo
//! history, open documents, background saving and render invalidation together.

mod config;
mod session;
pub mod tools;

#[cfg(test)]
mod test_util;

pub use config::{Config, ConfigError};
pub use session::{EditorSession, RenderInvalidator};

pub use landblock_core;
pub use landblock_map;
