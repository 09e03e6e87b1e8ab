use serde::Serialize;

use crate::error::{Error, Result};

/// Quantized bar intensities for one block, in increasing-frequency order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarFrame(Vec<u8>);

impl BarFrame {
    pub fn new(bars: Vec<u8>) -> Self {
        Self(bars)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for BarFrame {
    fn from(bars: Vec<u8>) -> Self {
        Self(bars)
    }
}

impl AsRef<[u8]> for BarFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Fixed metadata at the start of every spectrum document.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DocumentHeader {
    pub num_bars: u32,
    pub sample_rate: u32,
    /// Samples per block; one frame covers `block_size / sample_rate` seconds
    pub block_size: u32,
    /// Largest unnormalized block power seen during analysis. Informational only.
    pub max_spectral_energy: Option<f64>,
}

impl DocumentHeader {
    pub fn validate(&self) -> Result<()> {
        if self.num_bars == 0 {
            return Err(Error::config("num_bars must be at least 1"));
        }
        if self.sample_rate == 0 {
            return Err(Error::config("sample_rate must be positive"));
        }
        if self.block_size == 0 {
            return Err(Error::config("block_size must be at least 1"));
        }
        Ok(())
    }

    pub fn seconds_per_frame(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }

    /// Frame index covering the given playback position (in samples).
    pub fn frame_at_sample(&self, sample_pos: u64) -> u64 {
        sample_pos / self.block_size as u64
    }
}

/// A header plus its frames, in temporal order.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualizationDocument {
    pub header: DocumentHeader,
    pub frames: Vec<BarFrame>,
}

impl VisualizationDocument {
    pub fn new(header: DocumentHeader, frames: Vec<BarFrame>) -> Self {
        Self { header, frames }
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 * self.header.seconds_per_frame()
    }
}
