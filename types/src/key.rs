//! Output keys: `(tx id, output index)`, the map key for every output index.

use crate::error::TypeError;
use crate::hash::TxId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifies a transaction output by its owning tx id and output index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxOutputKey {
    pub tx_id: TxId,
    pub index: u32,
}

impl TxOutputKey {
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for TxOutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}

impl FromStr for TxOutputKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, index) = s
            .split_once(':')
            .ok_or_else(|| TypeError::InvalidOutputKey(s.to_string()))?;
        let index = index
            .parse::<u32>()
            .map_err(|_| TypeError::InvalidOutputKey(s.to_string()))?;
        Ok(Self::new(TxId::from_hex(id)?, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let key = TxOutputKey::new(TxId::new([7; 32]), 3);
        let parsed: TxOutputKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn parse_rejects_missing_index() {
        assert!("abcd".parse::<TxOutputKey>().is_err());
    }
}
