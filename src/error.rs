use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio block of {len} samples is too short for spectral analysis (need at least 2)")]
    InvalidBlock { len: usize },

    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupt spectrum document: {0}")]
    CorruptDocument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptDocument(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Maps an unexpected EOF to `CorruptDocument`; everything else stays `Io`.
    pub(crate) fn from_read(err: std::io::Error, what: &str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::CorruptDocument(format!("truncated {}", what))
        } else {
            Self::Io(err)
        }
    }
}
