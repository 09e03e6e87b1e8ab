pub mod bucket;
pub mod spectrum;

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::config::AnalysisConfig;
use crate::document::{BarFrame, DocumentHeader, VisualizationDocument};
use crate::error::{Error, Result};

use bucket::Bucketizer;
use spectrum::{AudioBlock, PowerSpectrum, SpectralEstimator};

/// Hook invoked once per analyzed block, from whichever worker processed it.
pub trait BlockObserver: Sync {
    fn observe(&self, index: usize, spectrum: &PowerSpectrum, frame: &BarFrame);
}

/// Logs the dominant frequency and bar row of every block.
pub struct LogObserver;

impl BlockObserver for LogObserver {
    fn observe(&self, index: usize, spectrum: &PowerSpectrum, frame: &BarFrame) {
        log::info!(
            "block {:5}: peak {:8.1} Hz, bins {}, bars {:?}",
            index,
            spectrum.peak_frequency().unwrap_or(0.0),
            spectrum.len(),
            frame.as_slice()
        );
    }
}

/// Runs the per-block analysis over a whole decoded signal.
pub struct Analyzer<'a> {
    config: AnalysisConfig,
    sample_rate: u32,
    estimator: SpectralEstimator,
    bucketizer: Bucketizer,
    observer: Option<&'a dyn BlockObserver>,
    progress: Option<ProgressBar>,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self> {
        config.validate(sample_rate)?;
        Ok(Self {
            config: config.clone(),
            sample_rate,
            estimator: SpectralEstimator::new(config.block_size, config.kaiser_beta),
            bucketizer: Bucketizer::from_config(config),
            observer: None,
            progress: None,
        })
    }

    pub fn with_observer(mut self, observer: &'a dyn BlockObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Number of frames a signal of `total_samples` produces.
    pub fn block_count(&self, total_samples: usize) -> usize {
        total_samples.div_ceil(self.config.block_size)
    }

    pub fn run(&self, samples: &[f32]) -> Result<VisualizationDocument> {
        let block_size = self.config.block_size;
        let num_blocks = self.block_count(samples.len());

        // Only the trailing block can be short; reject it before any work starts.
        if num_blocks > 0 {
            let tail = samples.len() - (num_blocks - 1) * block_size;
            if tail < 2 {
                return Err(Error::InvalidBlock { len: tail });
            }
        }

        log::info!(
            "Analyzing {} blocks of {} samples ({} bars, {:.0}-{:.0} Hz)",
            num_blocks,
            block_size,
            self.config.num_bars,
            self.config.freq_min,
            self.config.freq_max
        );

        let results: Vec<(BarFrame, f32)> = samples
            .par_chunks(block_size)
            .enumerate()
            .map(|(index, chunk)| {
                let block = AudioBlock {
                    samples: chunk,
                    sample_rate: self.sample_rate,
                };
                let spectrum = self.estimator.estimate(&block)?;
                let frame = self.bucketizer.bucketize(&spectrum);
                if let Some(observer) = self.observer {
                    observer.observe(index, &spectrum, &frame);
                }
                if let Some(ref pb) = self.progress {
                    pb.inc(1);
                }
                Ok((frame, spectrum.peak_power))
            })
            .collect::<Result<_>>()?;

        let max_spectral_energy = results
            .iter()
            .map(|(_, peak)| *peak as f64)
            .reduce(f64::max);
        let frames: Vec<BarFrame> = results.into_iter().map(|(frame, _)| frame).collect();

        log::debug!(
            "Analysis produced {} frames, max spectral energy {:?}",
            frames.len(),
            max_spectral_energy
        );

        let header = DocumentHeader {
            num_bars: self.config.num_bars as u32,
            sample_rate: self.sample_rate,
            block_size: block_size as u32,
            max_spectral_energy,
        };
        Ok(VisualizationDocument::new(header, frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn config(block_size: usize, num_bars: usize) -> AnalysisConfig {
        AnalysisConfig {
            block_size,
            num_bars,
            ..Default::default()
        }
    }

    #[test]
    fn frame_count_is_ceil_of_blocks() {
        let analyzer = Analyzer::new(&config(1024, 16), 44100).unwrap();
        for len in [0usize, 2, 1000, 1024, 1026, 4096, 5000] {
            let samples = vec![0.1f32; len];
            let doc = analyzer.run(&samples).unwrap();
            assert_eq!(doc.frames.len(), len.div_ceil(1024), "len {}", len);
            assert!(doc.frames.iter().all(|f| f.len() == 16));
        }
    }

    #[test]
    fn empty_signal_has_no_energy() {
        let analyzer = Analyzer::new(&config(1024, 16), 44100).unwrap();
        let doc = analyzer.run(&[]).unwrap();
        assert!(doc.frames.is_empty());
        assert_eq!(doc.header.max_spectral_energy, None);
    }

    #[test]
    fn single_sample_tail_aborts_document() {
        let analyzer = Analyzer::new(&config(1024, 16), 44100).unwrap();
        let samples = vec![0.1f32; 2049];
        assert!(matches!(
            analyzer.run(&samples),
            Err(Error::InvalidBlock { len: 1 })
        ));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        assert!(matches!(
            Analyzer::new(&config(0, 16), 44100),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            Analyzer::new(&config(1024, 0), 44100),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn sine_wave_lights_up_its_bar() {
        let sample_rate = 44100;
        let samples = sine(1000.0, sample_rate, 2 * sample_rate as usize);
        let cfg = AnalysisConfig {
            block_size: 1024,
            num_bars: 32,
            freq_min: 20.0,
            freq_max: 20000.0,
            ..Default::default()
        };
        let analyzer = Analyzer::new(&cfg, sample_rate).unwrap();
        let doc = analyzer.run(&samples).unwrap();
        assert_eq!(doc.frames.len(), 87);

        let bucketizer = Bucketizer::from_config(&cfg);
        let target = (0..32)
            .find(|&i| bucketizer.edge(i) <= 1000.0 && 1000.0 <= bucketizer.edge(i + 1))
            .unwrap();
        assert_eq!(target, 1);

        for (i, frame) in doc.frames.iter().enumerate() {
            let bars = frame.as_slice();
            let peak = bars[target] as u16;
            assert!(peak >= 32, "frame {}: {:?}", i, bars);
            assert_eq!(bars.iter().max(), Some(&bars[target]), "frame {}: {:?}", i, bars);
            for (j, &bar) in bars.iter().enumerate() {
                if j.abs_diff(target) >= 3 {
                    assert!(bar as u16 * 2 < peak, "frame {} bar {}: {:?}", i, j, bars);
                }
            }
        }
        assert!(doc.header.max_spectral_energy.unwrap() > 0.0);
    }

    #[test]
    fn frames_keep_block_order() {
        // alternate silence and a centred click (flat spectrum) so any reordering shows up
        let sample_rate = 8000;
        let block_size = 256;
        let mut samples = Vec::new();
        for i in 0..40 {
            let mut block = vec![0.0f32; block_size];
            if i % 2 == 0 {
                block[block_size / 2] = 1.0;
            }
            samples.extend(block);
        }
        let cfg = AnalysisConfig {
            block_size,
            num_bars: 8,
            freq_min: 0.0,
            freq_max: 4000.0,
            ..Default::default()
        };
        let doc = Analyzer::new(&cfg, sample_rate).unwrap().run(&samples).unwrap();
        for (i, frame) in doc.frames.iter().enumerate() {
            let expected = if i % 2 == 0 { 255 } else { 0 };
            assert!(frame.as_slice().iter().all(|&b| b == expected), "frame {}: {:?}", i, frame);
        }
    }

    struct Recorder(Mutex<Vec<usize>>);

    impl BlockObserver for Recorder {
        fn observe(&self, index: usize, spectrum: &PowerSpectrum, frame: &BarFrame) {
            assert!(!spectrum.is_empty());
            assert_eq!(frame.len(), 4);
            self.0.lock().unwrap().push(index);
        }
    }

    #[test]
    fn observer_sees_every_block_once() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let cfg = config(128, 4);
        {
            let analyzer = Analyzer::new(&cfg, 8000).unwrap().with_observer(&recorder);
            analyzer.run(&sine(440.0, 8000, 128 * 10 + 17)).unwrap();
        }

        let mut seen = recorder.0.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..11).collect::<Vec<_>>());
    }
}
