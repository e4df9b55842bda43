//! Commitment format versioning.

/// Version byte written into every commitment this node produces.
pub const DAO_PROTOCOL_VERSION: u8 = 1;

/// Oldest commitment version the parser still accepts.
pub const MIN_DAO_PROTOCOL_VERSION: u8 = 1;

/// Whether a commitment version found on chain can be decoded.
pub fn is_compatible(version: u8) -> bool {
    (MIN_DAO_PROTOCOL_VERSION..=DAO_PROTOCOL_VERSION).contains(&version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_version_is_compatible() {
        assert!(is_compatible(DAO_PROTOCOL_VERSION));
        assert!(!is_compatible(0));
        assert!(!is_compatible(DAO_PROTOCOL_VERSION + 1));
    }
}
