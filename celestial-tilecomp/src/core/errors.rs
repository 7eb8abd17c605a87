#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid codec parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid buffer length {length}: {reason}")]
    InvalidBufferLength { length: usize, reason: String },

    #[error("Corrupt compressed stream: {0}")]
    CorruptStream(String),

    #[error("Quantization failed: {0}")]
    QuantizationFailed(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("Invalid BITPIX value: {0}")]
    InvalidBitPix(i32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CompressionError>;

impl CompressionError {
    pub(crate) fn corrupt<S: Into<String>>(message: S) -> Self {
        Self::CorruptStream(message.into())
    }

    pub(crate) fn params<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameters(message.into())
    }
}
