use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Failures surfaced by encoding, decoding and file iteration.
///
/// Every variant carries a plain message so errors stay comparable in tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad magic, truncated header or block. The file is unreadable from here on.
    #[error("format error: {0}")]
    Format(String),

    /// A codec payload is internally inconsistent.
    #[error("decode error: {0}")]
    Decode(String),

    /// A load index was negative or decreasing.
    #[error("invalid load index: {0}")]
    LoadIndex(String),

    /// No maker is registered for a codec id or name.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The column cannot be represented by the requested codec.
    #[error("encode error: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Error::Format(format!("truncated stream: {e}"));
        }
        Error::Io(e.to_string())
    }
}
