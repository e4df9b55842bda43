use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpReturnError {
    #[error("empty OP_RETURN payload")]
    Empty,

    #[error("unknown protocol tag: {0:#04x}")]
    UnknownTag(u8),

    #[error("unsupported version {version} for tag {tag:#04x}")]
    UnsupportedVersion { tag: u8, version: u8 },

    #[error("invalid length for tag {tag:#04x}: expected {expected}, got {actual}")]
    InvalidLength {
        tag: u8,
        expected: usize,
        actual: usize,
    },

    #[error("OP_RETURN payload too large: {0} bytes")]
    TooLarge(usize),

    #[error("unknown lock reason: {0:#04x}")]
    UnknownLockReason(u8),

    #[error("lock time {0} below minimum")]
    LockTimeTooShort(u16),
}
