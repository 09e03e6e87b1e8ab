use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

use crate::error::{Error, Result};

/// One block of mono samples, borrowed from the decoded signal.
#[derive(Clone, Copy, Debug)]
pub struct AudioBlock<'a> {
    pub samples: &'a [f32],
    pub sample_rate: u32,
}

/// One-sided power spectrum of a single block.
#[derive(Clone, Debug)]
pub struct PowerSpectrum {
    /// Bin centre frequencies in Hz, strictly increasing
    pub frequencies: Vec<f32>,
    /// Power per bin, normalized so the loudest bin is 1.0 (all zero for silence)
    pub power: Vec<f32>,
    /// Loudest bin before normalization
    pub peak_power: f32,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Frequency of the loudest bin, if any.
    pub fn peak_frequency(&self) -> Option<f32> {
        self.power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| self.frequencies[i])
    }
}

struct Plan {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    /// Sum of squared window coefficients, used for density scaling
    window_power: f32,
}

impl Plan {
    fn new(len: usize, beta: f32) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);
        let window = kaiser_window(len, beta);
        let window_power = window.iter().map(|w| w * w).sum();
        Self {
            fft,
            window,
            window_power,
        }
    }
}

/// Kaiser-windowed periodogram estimator.
///
/// The FFT plan and window for the configured block size are built once; a
/// shorter trailing block gets a plan of its own on demand. The estimator only
/// holds immutable state and can be shared across worker threads.
pub struct SpectralEstimator {
    beta: f32,
    block_size: usize,
    full: Plan,
}

impl SpectralEstimator {
    pub fn new(block_size: usize, beta: f32) -> Self {
        Self {
            beta,
            block_size,
            full: Plan::new(block_size.max(2), beta),
        }
    }

    pub fn estimate(&self, block: &AudioBlock<'_>) -> Result<PowerSpectrum> {
        let n = block.samples.len();
        if n < 2 {
            return Err(Error::InvalidBlock { len: n });
        }

        if n == self.block_size {
            self.estimate_with(&self.full, block)
        } else {
            log::debug!("Planning FFT for short block of {} samples", n);
            self.estimate_with(&Plan::new(n, self.beta), block)
        }
    }

    fn estimate_with(&self, plan: &Plan, block: &AudioBlock<'_>) -> Result<PowerSpectrum> {
        let n = block.samples.len();
        let fs = block.sample_rate as f32;

        let mut input = plan.fft.make_input_vec();
        for ((dst, &s), &w) in input.iter_mut().zip(block.samples).zip(&plan.window) {
            *dst = s * w;
        }
        let mut output = plan.fft.make_output_vec();
        // Only fails on a buffer length mismatch, which make_*_vec rules out.
        plan.fft
            .process(&mut input, &mut output)
            .map_err(|_| Error::InvalidBlock { len: n })?;

        let scale = 1.0 / (fs * plan.window_power);
        let nyquist = if n % 2 == 0 { Some(n / 2) } else { None };

        let mut power: Vec<f32> = output
            .iter()
            .enumerate()
            .map(|(k, c)| {
                let p = c.norm_sqr() * scale;
                // One-sided: fold negative frequencies into every bin but DC and Nyquist
                if k == 0 || Some(k) == nyquist {
                    p
                } else {
                    2.0 * p
                }
            })
            .collect();

        let frequencies: Vec<f32> = (0..power.len())
            .map(|k| k as f32 * fs / n as f32)
            .collect();

        let peak_power = power.iter().copied().fold(0.0f32, f32::max);
        if peak_power > 0.0 {
            for p in &mut power {
                *p /= peak_power;
            }
        }

        Ok(PowerSpectrum {
            frequencies,
            power,
            peak_power,
        })
    }
}

/// Symmetric Kaiser window of `len` points with shape parameter `beta`.
pub fn kaiser_window(len: usize, beta: f32) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    let beta = beta as f64;
    let denom = bessel_i0(beta);
    let m = (len - 1) as f64;
    (0..len)
        .map(|i| {
            let r = 2.0 * i as f64 / m - 1.0;
            let arg = beta * (1.0 - r * r).max(0.0).sqrt();
            (bessel_i0(arg) / denom) as f32
        })
        .collect()
}

/// Zeroth-order modified Bessel function of the first kind (power series).
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut k = 1.0;
    loop {
        term *= (half / k) * (half / k);
        sum += term;
        if term < sum * 1e-16 {
            break;
        }
        k += 1.0;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn bessel_i0_matches_known_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008).abs() < 1e-9);
        assert!((bessel_i0(5.0) - 27.239_871_823_604_44).abs() < 1e-6);
    }

    #[test]
    fn kaiser_window_is_symmetric_and_peaks_at_centre() {
        let w = kaiser_window(65, 14.0);
        assert_eq!(w.len(), 65);
        for i in 0..w.len() {
            assert!((w[i] - w[w.len() - 1 - i]).abs() < 1e-6);
        }
        assert!((w[32] - 1.0).abs() < 1e-6);
        assert!(w[0] < 1e-4);
    }

    #[test]
    fn kaiser_beta_zero_is_rectangular() {
        let w = kaiser_window(16, 0.0);
        assert!(w.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn rejects_degenerate_blocks() {
        let est = SpectralEstimator::new(1024, 14.0);
        for len in [0usize, 1] {
            let samples = vec![0.5; len];
            let block = AudioBlock {
                samples: &samples,
                sample_rate: 44100,
            };
            assert!(matches!(
                est.estimate(&block),
                Err(Error::InvalidBlock { len: l }) if l == len
            ));
        }
    }

    #[test]
    fn spectrum_shape_and_normalization() {
        let est = SpectralEstimator::new(1024, 14.0);
        let samples = sine(1000.0, 44100, 1024);
        let spectrum = est
            .estimate(&AudioBlock {
                samples: &samples,
                sample_rate: 44100,
            })
            .unwrap();

        assert_eq!(spectrum.len(), 513);
        assert_eq!(spectrum.frequencies.len(), spectrum.power.len());
        assert_eq!(spectrum.frequencies[0], 0.0);
        assert!((spectrum.frequencies[512] - 22050.0).abs() < 1e-2);
        assert!(spectrum.frequencies.windows(2).all(|w| w[0] < w[1]));

        let max = spectrum.power.iter().copied().fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert!(spectrum.peak_power > 0.0);

        let peak = spectrum.peak_frequency().unwrap();
        assert!((peak - 1000.0).abs() < 44100.0 / 1024.0);
    }

    #[test]
    fn short_and_odd_blocks_are_analyzed() {
        let est = SpectralEstimator::new(1024, 14.0);
        let samples = sine(440.0, 8000, 101);
        let spectrum = est
            .estimate(&AudioBlock {
                samples: &samples,
                sample_rate: 8000,
            })
            .unwrap();
        assert_eq!(spectrum.len(), 51);

        let two = [1.0f32, -1.0];
        let spectrum = est
            .estimate(&AudioBlock {
                samples: &two,
                sample_rate: 8000,
            })
            .unwrap();
        assert_eq!(spectrum.len(), 2);
    }

    #[test]
    fn silence_stays_zero() {
        let est = SpectralEstimator::new(256, 14.0);
        let samples = vec![0.0f32; 256];
        let spectrum = est
            .estimate(&AudioBlock {
                samples: &samples,
                sample_rate: 44100,
            })
            .unwrap();
        assert_eq!(spectrum.peak_power, 0.0);
        assert!(spectrum.power.iter().all(|&p| p == 0.0));
    }
}
