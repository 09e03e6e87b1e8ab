use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Parameters of the block analysis. Shared read-only by every worker.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// Samples per block; one frame is emitted per block
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_num_bars")]
    pub num_bars: usize,
    /// Lower edge of the first bucket (Hz)
    #[serde(default = "default_freq_min")]
    pub freq_min: f32,
    /// Upper edge of the last bucket (Hz)
    #[serde(default = "default_freq_max")]
    pub freq_max: f32,
    /// dB value mapped to intensity 0
    #[serde(default = "default_min_vol")]
    pub min_vol: f32,
    /// dB value mapped to intensity 255
    #[serde(default = "default_max_vol")]
    pub max_vol: f32,
    /// Kaiser window shape parameter
    #[serde(default = "default_kaiser_beta")]
    pub kaiser_beta: f32,
}

#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            num_bars: default_num_bars(),
            freq_min: default_freq_min(),
            freq_max: default_freq_max(),
            min_vol: default_min_vol(),
            max_vol: default_max_vol(),
            kaiser_beta: default_kaiser_beta(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl AnalysisConfig {
    /// Rejects configurations that cannot produce a valid document.
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        if self.num_bars == 0 {
            return Err(Error::config("num_bars must be at least 1"));
        }
        if self.num_bars > u32::MAX as usize {
            return Err(Error::config(format!("num_bars {} is too large", self.num_bars)));
        }
        if self.block_size == 0 {
            return Err(Error::config("block_size must be at least 1"));
        }
        if self.block_size > u32::MAX as usize {
            return Err(Error::config(format!("block_size {} is too large", self.block_size)));
        }
        if sample_rate == 0 {
            return Err(Error::config("sample_rate must be positive"));
        }
        if !self.freq_min.is_finite() || !self.freq_max.is_finite() || self.freq_min < 0.0 {
            return Err(Error::config(format!(
                "frequency range [{}, {}] must be finite and non-negative",
                self.freq_min, self.freq_max
            )));
        }
        if self.freq_min >= self.freq_max {
            return Err(Error::config(format!(
                "freq_min ({}) must be below freq_max ({})",
                self.freq_min, self.freq_max
            )));
        }
        if !self.min_vol.is_finite() || !self.max_vol.is_finite() {
            return Err(Error::config("volume range must be finite"));
        }
        if self.min_vol >= self.max_vol {
            return Err(Error::config(format!(
                "min_vol ({}) must be below max_vol ({})",
                self.min_vol, self.max_vol
            )));
        }
        if !self.kaiser_beta.is_finite() || self.kaiser_beta < 0.0 {
            return Err(Error::config(format!(
                "kaiser_beta must be a non-negative number, got {}",
                self.kaiser_beta
            )));
        }
        Ok(())
    }
}

fn default_block_size() -> usize { 2048 }
fn default_num_bars() -> usize { 32 }
fn default_freq_min() -> f32 { 20.0 }
fn default_freq_max() -> f32 { 20_000.0 }
fn default_min_vol() -> f32 { -80.0 }
fn default_max_vol() -> f32 { 0.0 }
fn default_kaiser_beta() -> f32 { 14.0 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Explicit path first, then `spectrobars.toml` in the working directory, then the user config dirs.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spectrobars.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectrobars").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectrobars").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
