use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use super::{varint, FLAG_MAX_ENERGY, MAGIC, TRAILER_MAGIC, VERSION};
use crate::document::{BarFrame, DocumentHeader, VisualizationDocument};
use crate::error::{Error, Result};

/// Streams frames into a document. The header goes out on construction,
/// the trailer on [`FrameEncoder::finish`].
pub struct FrameEncoder<W: Write> {
    writer: W,
    num_bars: usize,
    frames_written: u32,
}

impl<W: Write> FrameEncoder<W> {
    pub fn new(mut writer: W, header: &DocumentHeader) -> Result<Self> {
        header.validate()?;

        let flags = if header.max_spectral_energy.is_some() {
            FLAG_MAX_ENERGY
        } else {
            0
        };
        writer.write_all(&MAGIC)?;
        writer.write_all(&[VERSION, flags])?;
        varint::write_u64(&mut writer, header.num_bars as u64)?;
        varint::write_u64(&mut writer, header.sample_rate as u64)?;
        varint::write_u64(&mut writer, header.block_size as u64)?;
        if let Some(energy) = header.max_spectral_energy {
            writer.write_all(&energy.to_le_bytes())?;
        }

        Ok(Self {
            writer,
            num_bars: header.num_bars as usize,
            frames_written: 0,
        })
    }

    pub fn push(&mut self, frame: &BarFrame) -> Result<()> {
        if frame.len() != self.num_bars {
            return Err(Error::config(format!(
                "frame {} has {} bars, document expects {}",
                self.frames_written,
                frame.len(),
                self.num_bars
            )));
        }
        let next = self
            .frames_written
            .checked_add(1)
            .ok_or_else(|| Error::config("too many frames for one document"))?;
        self.writer.write_all(frame.as_slice())?;
        self.frames_written = next;
        Ok(())
    }

    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Writes the trailer and flushes. Returns the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.write_all(&self.frames_written.to_le_bytes())?;
        self.writer.write_all(&TRAILER_MAGIC)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

pub fn write_document<W: Write>(writer: W, doc: &VisualizationDocument) -> Result<W> {
    let mut encoder = FrameEncoder::new(writer, &doc.header)?;
    for frame in &doc.frames {
        encoder.push(frame)?;
    }
    encoder.finish()
}

impl VisualizationDocument {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        write_document(Vec::new(), self)
    }
}

/// Writes to a temporary file next to `path` and renames it into place once
/// everything is on disk, so `path` never holds a partial document.
pub fn write_document_atomic(path: &Path, doc: &VisualizationDocument) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let writer = BufWriter::new(tmp.as_file_mut());
        write_document(writer, doc)?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    log::debug!(
        "Wrote {} frames of {} bars to {}",
        doc.frames.len(),
        doc.header.num_bars,
        path.display()
    );
    Ok(())
}
