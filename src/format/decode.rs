use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use super::{varint, FLAG_MAX_ENERGY, MAGIC, TRAILER_LEN, TRAILER_MAGIC, VERSION};
use crate::document::{BarFrame, DocumentHeader, VisualizationDocument};
use crate::error::{Error, Result};

/// Validated view over an encoded document.
///
/// Opening checks the header, the trailer and the body length, so every
/// later frame read is in bounds. Frames are read on demand.
pub struct DocumentReader<R> {
    reader: R,
    header: DocumentHeader,
    body_start: u64,
    frame_count: usize,
}

impl<R: Read + Seek> DocumentReader<R> {
    pub fn open(mut reader: R) -> Result<Self> {
        let header = read_header(&mut reader)?;
        let body_start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;

        if end < body_start + TRAILER_LEN {
            return Err(Error::corrupt("missing end-of-stream trailer"));
        }
        reader.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
        let mut trailer = [0u8; TRAILER_LEN as usize];
        reader
            .read_exact(&mut trailer)
            .map_err(|e| Error::from_read(e, "trailer"))?;
        if trailer[4..] != TRAILER_MAGIC {
            return Err(Error::corrupt("missing end-of-stream marker"));
        }
        let frame_count = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as u64;

        let body_len = end - TRAILER_LEN - body_start;
        let expected = frame_count * header.num_bars as u64;
        if body_len != expected {
            return Err(Error::corrupt(format!(
                "body holds {} bytes but trailer declares {} frames of {} bars",
                body_len, frame_count, header.num_bars
            )));
        }

        log::debug!(
            "Opened spectrum document: {} frames of {} bars",
            frame_count,
            header.num_bars
        );

        Ok(Self {
            reader,
            header,
            body_start,
            frame_count: frame_count as usize,
        })
    }

    pub fn header(&self) -> &DocumentHeader {
        &self.header
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Reads frame `index` without touching the frames before it.
    pub fn frame(&mut self, index: usize) -> Result<Option<BarFrame>> {
        if index >= self.frame_count {
            return Ok(None);
        }
        let num_bars = self.header.num_bars as usize;
        let offset = self.body_start + index as u64 * num_bars as u64;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut bars = vec![0u8; num_bars];
        self.reader
            .read_exact(&mut bars)
            .map_err(|e| Error::from_read(e, "frame data"))?;
        Ok(Some(BarFrame::new(bars)))
    }

    /// Lazy pass over all frames, starting again from frame 0 on every call.
    pub fn frames(&mut self) -> Frames<'_, R> {
        Frames {
            reader: self,
            next: 0,
        }
    }

    pub fn into_document(mut self) -> Result<VisualizationDocument> {
        let num_bars = self.header.num_bars as usize;
        self.reader.seek(SeekFrom::Start(self.body_start))?;
        let mut body = vec![0u8; self.frame_count * num_bars];
        self.reader
            .read_exact(&mut body)
            .map_err(|e| Error::from_read(e, "frame data"))?;
        let frames = body
            .chunks_exact(num_bars)
            .map(|bars| BarFrame::new(bars.to_vec()))
            .collect();
        Ok(VisualizationDocument::new(self.header, frames))
    }
}

pub struct Frames<'a, R> {
    reader: &'a mut DocumentReader<R>,
    next: usize,
}

impl<R: Read + Seek> Iterator for Frames<'_, R> {
    type Item = Result<BarFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        match self.reader.frame(index) {
            Ok(Some(frame)) => {
                self.next += 1;
                Some(Ok(frame))
            }
            Ok(None) => None,
            Err(e) => {
                // stop after the first failure
                self.next = self.reader.frame_count;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.frame_count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

fn read_header<R: Read>(reader: &mut R) -> Result<DocumentHeader> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| Error::from_read(e, "header"))?;
    if magic != MAGIC {
        return Err(Error::corrupt(format!("bad magic {:02x?}", magic)));
    }

    let mut version_flags = [0u8; 2];
    reader
        .read_exact(&mut version_flags)
        .map_err(|e| Error::from_read(e, "header"))?;
    let [version, flags] = version_flags;
    if version != VERSION {
        return Err(Error::corrupt(format!(
            "unsupported version {} (expected {})",
            version, VERSION
        )));
    }
    if flags & !FLAG_MAX_ENERGY != 0 {
        return Err(Error::corrupt(format!("unknown header flags {:#04x}", flags)));
    }

    let num_bars = varint::read_u32(reader, "num_bars")?;
    let sample_rate = varint::read_u32(reader, "sample_rate")?;
    let block_size = varint::read_u32(reader, "block_size")?;

    let max_spectral_energy = if flags & FLAG_MAX_ENERGY != 0 {
        let mut raw = [0u8; 8];
        reader
            .read_exact(&mut raw)
            .map_err(|e| Error::from_read(e, "max_spectral_energy"))?;
        Some(f64::from_le_bytes(raw))
    } else {
        None
    };

    let header = DocumentHeader {
        num_bars,
        sample_rate,
        block_size,
        max_spectral_energy,
    };
    header
        .validate()
        .map_err(|e| Error::corrupt(format!("invalid header: {}", e)))?;
    Ok(header)
}

pub fn read_document<R: Read + Seek>(reader: R) -> Result<VisualizationDocument> {
    DocumentReader::open(reader)?.into_document()
}

pub fn read_document_file(path: &Path) -> Result<VisualizationDocument> {
    let file = File::open(path)?;
    read_document(BufReader::new(file))
}

impl VisualizationDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        read_document(Cursor::new(bytes))
    }
}
