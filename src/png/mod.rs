//! PNG chunk codec and the `parameters` text adapter built on it.
//!
//! - [`chunk`] — parse a PNG byte stream into [`Chunk`]s and serialize it back
//! - [`params`] — locate, extract, and replace the generation parameters

pub mod chunk;
pub mod params;

pub use chunk::{Chunk, SIGNATURE};
pub use params::{extract, write};
