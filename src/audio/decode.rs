use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded mono signal.
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// First decodable track of a file, pulled one packet at a time.
struct TrackReader {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    sample_buf: Option<SampleBuffer<f32>>,
}

impl TrackReader {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let source = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let format = symphonia::default::get_probe()
            .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
            .context("Failed to probe audio format")?
            .format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio tracks found")?;
        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create audio decoder")?;

        log::debug!("Audio track {} @ {}Hz", track_id, sample_rate);

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            sample_buf: None,
        })
    }

    /// Decodes the next packet of the track into `mono`. Returns `false` at end of stream.
    fn decode_next(&mut self, mono: &mut Vec<f32>) -> Result<bool> {
        let packet = match self.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(false);
            }
            Err(SymphoniaError::ResetRequired) => {
                log::warn!("Audio stream changed parameters mid-file; stopping here");
                return Ok(false);
            }
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };
        if packet.track_id() != self.track_id {
            return Ok(true);
        }

        let decoded = match self.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                return Ok(true);
            }
            Err(e) => return Err(e).context("Failed to decode audio packet"),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let needed = decoded.capacity() * channels;
        if self.sample_buf.as_ref().map_or(true, |b| b.capacity() < needed) {
            self.sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        if let Some(buf) = self.sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), channels, mono);
        }
        Ok(true)
    }
}

/// Decodes the first audio track of `path` and averages its channels to mono.
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let mut track = TrackReader::open(path)?;
    let mut samples = Vec::new();
    while track.decode_next(&mut samples)? {}

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        samples.len(),
        track.sample_rate,
        samples.len() as f32 / track.sample_rate as f32
    );
    Ok(AudioData {
        samples,
        sample_rate: track.sample_rate,
    })
}

/// Appends the per-frame channel average of interleaved `samples` to `out`.
pub fn downmix_into(samples: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(samples);
        return;
    }
    out.extend(
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
