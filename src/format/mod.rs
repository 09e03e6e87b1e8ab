//! On-disk spectrum document.
//!
//! ```text
//! "SBAR" | version u8 | flags u8 | num_bars, sample_rate, block_size (LEB128)
//!        | [max_spectral_energy f64 LE, if flags & 1]
//!        | frame_count * num_bars bar bytes
//!        | frame_count u32 LE | "SEND"
//! ```
//!
//! The trailer doubles as the end-of-stream marker: a document cut short
//! anywhere after its header fails validation instead of decoding partially.

pub mod decode;
pub mod encode;
mod varint;

pub use decode::{read_document, read_document_file, DocumentReader};
pub use encode::{write_document, write_document_atomic, FrameEncoder};

pub const MAGIC: [u8; 4] = *b"SBAR";
pub const TRAILER_MAGIC: [u8; 4] = *b"SEND";
pub const VERSION: u8 = 1;

pub(crate) const FLAG_MAX_ENERGY: u8 = 0b0000_0001;
pub(crate) const TRAILER_LEN: u64 = 8;
