use thiserror::Error;

/// Errors surfaced by the CCSDS 122 codec.
///
/// Every variant maps to one of the five error kinds from the design:
/// input I/O, format rejection, integrity failure, out-of-range
/// parameters, and decoder desynchronization.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    InputIo(#[from] std::io::Error),

    #[error("image I/O error: {0}")]
    ImageIo(#[from] image::ImageError),

    #[error("format rejected: {0}")]
    FormatReject(String),

    #[error("integrity check failed: stored CRC32 {expected:#010x}, computed {actual:#010x}")]
    IntegrityFailure { expected: u32, actual: u32 },

    #[error("parameter out of range: {0}")]
    ParameterOutOfRange(String),

    #[error("arithmetic decoder desynchronized: {0}")]
    DecoderDesync(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
