//! Command-line arguments and the validated miner configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use hyper::http::uri::Authority;
use hyper::Uri;
use miner_core::coinbase::MAX_MINER_TAG_SIZE;
use miner_core::network::DEFAULT_MINER_TAG;
use miner_core::{AddressError, PayoutAddress};
use thiserror::Error;

/// Holds the parsed CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Scrypt solo miner driven by a node's getblocktemplate",
    long_about = None
)]
pub struct Args {
    /// Node RPC address as host[:port]; the port defaults to the wallet's chain
    #[arg(short = 'a', long = "address")]
    pub address: String,

    /// RPC user name
    #[arg(short = 'u', long = "user")]
    pub user: String,

    /// RPC password
    #[arg(short = 'p', long = "pass")]
    pub pass: String,

    /// P2PKH address that receives the block reward
    #[arg(short = 'w', long = "wallet")]
    pub wallet: String,

    /// Number of search worker threads
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Delay between getblocktemplate polls, in milliseconds
    #[arg(long = "poll-interval-ms", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Timeout for a single RPC call, in seconds
    #[arg(long = "rpc-timeout-secs", default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// Text appended to the coinbase scriptSig
    #[arg(long = "tag", default_value = DEFAULT_MINER_TAG)]
    pub tag: String,

    /// Also append logs to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

/// A configuration the miner refuses to start with.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Wallet(#[from] AddressError),
    #[error("thread count must be at least 1")]
    Threads,
    #[error("invalid node address `{0}`")]
    NodeAddress(String),
    #[error("miner tag is {0} bytes, at most {max} allowed", max = MAX_MINER_TAG_SIZE)]
    MinerTag(usize),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Full JSON-RPC endpoint, e.g. `http://127.0.0.1:9332/`.
    pub node_url: Uri,
    pub user: String,
    pub pass: String,
    pub payout: PayoutAddress,
    pub threads: usize,
    pub poll_interval: Duration,
    pub rpc_timeout: Duration,
    pub miner_tag: Vec<u8>,
    pub log_file: Option<PathBuf>,
}

impl MinerConfig {
    /// Validate `args`. The wallet is decoded first since it decides the
    /// default RPC port.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let payout = PayoutAddress::parse(&args.wallet)?;

        if args.threads == 0 {
            return Err(ConfigError::Threads);
        }
        if args.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("poll interval"));
        }
        if args.rpc_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("RPC timeout"));
        }

        let miner_tag = args.tag.into_bytes();
        if miner_tag.len() > MAX_MINER_TAG_SIZE {
            return Err(ConfigError::MinerTag(miner_tag.len()));
        }

        let node_url = node_url(&args.address, payout.network.default_rpc_port())?;

        Ok(MinerConfig {
            node_url,
            user: args.user,
            pass: args.pass,
            payout,
            threads: args.threads,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            rpc_timeout: Duration::from_secs(args.rpc_timeout_secs),
            miner_tag,
            log_file: args.log_file,
        })
    }
}

/// Build the RPC endpoint from `host[:port]`, filling in `default_port`.
fn node_url(address: &str, default_port: u16) -> Result<Uri, ConfigError> {
    let invalid = || ConfigError::NodeAddress(address.to_string());

    let trimmed = address.trim();
    let host_port = trimmed
        .strip_prefix("http://")
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    if host_port.is_empty() || host_port.contains('/') {
        return Err(invalid());
    }

    let authority = Authority::from_str(host_port).map_err(|_| invalid())?;
    let has_port_segment = authority.host().len() != authority.as_str().len();
    let authority = match authority.port_u16() {
        Some(_) => authority,
        None if has_port_segment => return Err(invalid()),
        None => Authority::from_str(&format!("{}:{}", authority.host(), default_port))
            .map_err(|_| invalid())?,
    };

    Uri::builder()
        .scheme("http")
        .authority(authority)
        .path_and_query("/")
        .build()
        .map_err(|_| invalid())
}
