use crate::config::AnalysisConfig;
use crate::document::BarFrame;

use super::spectrum::PowerSpectrum;

/// Maps a power spectrum onto `num_bars` linearly spaced frequency buckets.
///
/// Bucket `i` spans `[edge(i), edge(i + 1)]`, both ends inclusive, and the
/// upper edge of the last bucket is `freq_max` itself. A bucket that covers
/// no spectrum bin yields 0.
#[derive(Clone, Debug)]
pub struct Bucketizer {
    num_bars: usize,
    freq_min: f32,
    freq_max: f32,
    min_vol: f32,
    max_vol: f32,
}

impl Bucketizer {
    pub fn new(num_bars: usize, freq_min: f32, freq_max: f32, min_vol: f32, max_vol: f32) -> Self {
        Self {
            num_bars,
            freq_min,
            freq_max,
            min_vol,
            max_vol,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.num_bars,
            config.freq_min,
            config.freq_max,
            config.min_vol,
            config.max_vol,
        )
    }

    pub fn num_bars(&self) -> usize {
        self.num_bars
    }

    /// Lower edge of bucket `i`; `edge(num_bars)` is `freq_max`.
    pub fn edge(&self, i: usize) -> f32 {
        if i >= self.num_bars {
            return self.freq_max;
        }
        let step = (self.freq_max - self.freq_min) / self.num_bars as f32;
        self.freq_min + i as f32 * step
    }

    pub fn bucketize(&self, spectrum: &PowerSpectrum) -> BarFrame {
        let db = self.to_db(&spectrum.power);
        let freqs = &spectrum.frequencies;

        let bars = (0..self.num_bars)
            .map(|i| {
                let lo = self.edge(i);
                let hi = self.edge(i + 1);

                let start = freqs.partition_point(|&f| f < lo);
                let mut sum = 0.0f64;
                let mut count = 0usize;
                for (&f, &d) in freqs[start..].iter().zip(&db[start..]) {
                    if f > hi {
                        break;
                    }
                    sum += d as f64;
                    count += 1;
                }

                if count == 0 {
                    0
                } else {
                    self.quantize((sum / count as f64) as f32)
                }
            })
            .collect();

        BarFrame::new(bars)
    }

    /// Power in dB relative to the spectrum's own maximum. Zero power is `-inf`.
    fn to_db(&self, power: &[f32]) -> Vec<f32> {
        let max = power.iter().copied().fold(0.0f32, f32::max);
        if max <= 0.0 {
            return vec![f32::NEG_INFINITY; power.len()];
        }
        power.iter().map(|&p| 10.0 * (p / max).log10()).collect()
    }

    /// Linear map of `[min_vol, max_vol]` onto `[0, 255]`, clamped. `-inf` maps to 0.
    pub fn quantize(&self, db: f32) -> u8 {
        let t = (db - self.min_vol) / (self.max_vol - self.min_vol);
        if t.is_nan() {
            return 0;
        }
        (t.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}
