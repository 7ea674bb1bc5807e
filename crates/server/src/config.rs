//! Server configuration from command-line flags and `TRACECHAIN_*` variables.

use clap::Parser;
use std::net::SocketAddr;
use tracechain_chain::{LedgerConfig, MempoolConfig};

#[derive(Debug, Clone, Parser)]
#[command(name = "tracechain-server")]
#[command(about = "Supply-chain traceability ledger with an HTTP API", long_about = None)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    #[arg(long, env = "TRACECHAIN_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Leading zero hex digits required in a mined block hash
    #[arg(long, env = "TRACECHAIN_DIFFICULTY", default_value_t = 2)]
    pub difficulty: u32,

    /// Maximum transactions per mined block
    #[arg(long, env = "TRACECHAIN_MAX_BLOCK_TXS", default_value_t = 10)]
    pub max_block_txs: usize,

    /// Maximum transactions waiting to be mined
    #[arg(long, env = "TRACECHAIN_MEMPOOL_CAPACITY", default_value_t = 10_000)]
    pub mempool_capacity: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "TRACECHAIN_LOG", default_value = "info")]
    pub log_filter: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "TRACECHAIN_JSON_LOGS")]
    pub json_logs: bool,

    /// Create the sample products and mine them into the first block at start-up
    #[arg(
        long,
        env = "TRACECHAIN_SEED_DEMO",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub seed_demo: bool,
}

impl ServerConfig {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            difficulty: self.difficulty,
            max_block_transactions: self.max_block_txs,
            mempool: MempoolConfig {
                max_transactions: self.mempool_capacity,
            },
            ..LedgerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::parse_from(["tracechain-server"]);
        assert_eq!(config.bind, "127.0.0.1:5000".parse().unwrap());
        assert!(config.seed_demo);
        assert_eq!(config.ledger_config(), LedgerConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::parse_from([
            "tracechain-server",
            "--difficulty",
            "4",
            "--max-block-txs",
            "25",
            "--seed-demo",
            "false",
        ]);
        let ledger = config.ledger_config();
        assert_eq!(ledger.difficulty, 4);
        assert_eq!(ledger.max_block_transactions, 25);
        assert_eq!(ledger.mining_reward, 10);
        assert!(!config.seed_demo);
    }
}
