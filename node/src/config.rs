//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use dao_ledger::GenesisConfig;
use dao_network::{PeerId, RequestPolicy, DEFAULT_REQUEST_TIMEOUT};
use dao_types::{NetworkId, TxId};

use crate::logging::LogFormat;
use crate::NodeError;

/// Where blocks come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// Parses raw blocks from a base-chain daemon.
    Full,
    /// Receives classified blocks from peers and re-derives them.
    Lite,
}

/// Overrides of the per-network genesis constants. Unset fields keep the
/// network's values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisOverrides {
    /// Hex tx id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<u64>,
}

/// Configuration for a DAO node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which base-chain network the DAO lives on.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    #[serde(default = "default_mode")]
    pub mode: NodeMode,

    #[serde(default)]
    pub genesis: GenesisOverrides,

    /// Snapshot files are written here.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// A snapshot candidate is taken every this many blocks.
    #[serde(default = "default_snapshot_grid")]
    pub snapshot_grid: u64,

    /// Write the last known good snapshot to `data_dir`.
    #[serde(default)]
    pub persist_snapshots: bool,

    /// Per-request timeout for block and payload fetches.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Peers tried per fetch before giving up.
    #[serde(default = "default_max_request_attempts")]
    pub max_request_attempts: usize,

    /// Seed peers.
    #[serde(default)]
    pub peers: Vec<String>,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Regtest
}

fn default_mode() -> NodeMode {
    NodeMode::Full
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dao_data")
}

fn default_snapshot_grid() -> u64 {
    20
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_max_request_attempts() -> usize {
    4
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.snapshot_grid == 0 {
            return Err(NodeError::Config("snapshot_grid must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(NodeError::Config("request_timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// The network's genesis constants with the configured overrides.
    pub fn genesis_config(&self) -> Result<GenesisConfig, NodeError> {
        let mut genesis = GenesisConfig::for_network(self.network);
        if let Some(hex) = &self.genesis.tx_id {
            genesis.tx_id = TxId::from_hex(hex).map_err(|e| NodeError::Config(format!("genesis.tx_id: {e}")))?;
        }
        if let Some(height) = self.genesis.block_height {
            genesis.block_height = height;
        }
        if let Some(supply) = self.genesis.total_supply {
            genesis.total_supply = supply;
        }
        Ok(genesis)
    }

    pub fn request_policy(&self) -> RequestPolicy {
        RequestPolicy {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_attempts: self.max_request_attempts,
            shuffle: true,
        }
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(PeerId::new).collect()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("dao_snapshot_{}.bin", self.network.as_str()))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            mode: default_mode(),
            genesis: GenesisOverrides::default(),
            data_dir: default_data_dir(),
            snapshot_grid: default_snapshot_grid(),
            persist_snapshots: false,
            request_timeout_secs: default_request_timeout_secs(),
            max_request_attempts: default_max_request_attempts(),
            peers: Vec::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
