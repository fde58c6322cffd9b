//! Node-facing half of the Scrypt solo miner.
//!
//! This crate provides:
//! - A JSON-RPC 1.0 client for `getblocktemplate` and `submitblock`
//! - The polling loop that supersedes stale searches and submits blocks
//! - Command-line configuration, logging setup and mining statistics

pub mod config;
pub mod dedup;
pub mod logging;
pub mod orchestrator;
pub mod rpc;
pub mod stats;

pub use config::{Args, ConfigError, MinerConfig};
pub use orchestrator::Orchestrator;
pub use rpc::{Auth, NodeClient, RpcClient, RpcError, SubmitOutcome};
pub use stats::MiningStats;
