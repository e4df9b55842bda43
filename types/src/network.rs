//! Base-chain network identifier.

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which base-chain network the DAO runs on. Parameter defaults and genesis
/// constants differ per network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Mainnet,
    Testnet,
    Regtest,
}

impl NetworkId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }
}

impl FromStr for NetworkId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            "regtest" | "dev" => Ok(Self::Regtest),
            other => Err(TypeError::UnknownNetwork(other.to_string())),
        }
    }
}
