use thiserror::Error;

/// Errors raised while constructing fundamental types from external input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown parameter: {0}")]
    UnknownParam(String),

    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("invalid output key: {0}")]
    InvalidOutputKey(String),
}
