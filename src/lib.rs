//! Offline spectrum analysis for music visualizers.
//!
//! A decoded mono signal is cut into fixed-size blocks; each block becomes one
//! frame of quantized bar heights, and the frames are stored in a compact
//! binary document that a renderer reads back in sync with playback.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod inspect;

pub use document::{BarFrame, DocumentHeader, VisualizationDocument};
pub use error::{Error, Result};
