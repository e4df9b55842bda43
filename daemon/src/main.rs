//! BSQ DAO daemon: replays raw block dumps through a full node and prints
//! the governance state it derives.

mod replay;

use clap::Parser;
use dao_node::{init_logging, LogFormat, NodeConfig, NodeMode, ShutdownController};
use dao_types::NetworkId;
use std::path::PathBuf;

use crate::replay::FileChain;

#[derive(Parser)]
#[command(name = "dao-daemon", about = "BSQ DAO governance node")]
struct Cli {
    /// Base-chain network: "mainnet", "testnet" or "regtest". Overrides the
    /// config file.
    #[arg(long, env = "DAO_NETWORK")]
    network: Option<NetworkId>,

    /// Snapshot directory.
    #[arg(long, env = "DAO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Blocks between snapshot candidates.
    #[arg(long, env = "DAO_SNAPSHOT_GRID")]
    snapshot_grid: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DAO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output: "human" or "json".
    #[arg(long, env = "DAO_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Append Prometheus metrics to the replay report.
    #[arg(long, env = "DAO_METRICS")]
    metrics: bool,

    /// TOML configuration file. Flags and env vars override its values.
    #[arg(long, env = "DAO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Parse a JSON dump of raw blocks and report cycles, vote results and
    /// issuance.
    Replay {
        /// JSON array of raw blocks.
        #[arg(long)]
        blocks: PathBuf,
    },
    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    /// The file config (or defaults) with flags applied on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)?,
            None => NodeConfig::default(),
        };
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(grid) = self.snapshot_grid {
            config.snapshot_grid = grid;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if self.metrics {
            config.enable_metrics = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Replay { blocks } => {
            init_logging(config.log_format, &config.log_level)?;
            if config.mode == NodeMode::Lite {
                tracing::warn!("replay always runs as a full node; mode = \"lite\" ignored");
            }
            tracing::info!(network = config.network.as_str(), dump = %blocks.display(), "starting replay");
            let chain = FileChain::from_json_file(&blocks)?;
            if chain.is_empty() {
                anyhow::bail!("{} holds no blocks", blocks.display());
            }
            let shutdown = ShutdownController::new();
            let report = tokio::select! {
                report = replay::replay(config, chain) => report?,
                _ = shutdown.wait_for_signal() => anyhow::bail!("replay interrupted"),
            };
            print!("{report}");
        }
    }

    Ok(())
}
