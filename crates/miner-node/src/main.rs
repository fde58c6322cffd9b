use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use miner_core::{BlockAssembler, SearchEngine};
use miner_node::{logging, Args, Auth, MinerConfig, Orchestrator, RpcClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_file.as_deref())?;

    let config = MinerConfig::from_args(args).context("invalid configuration")?;
    info!(
        node = %config.node_url,
        network = %config.payout.network,
        threads = config.threads,
        "configuration loaded"
    );

    let node = Arc::new(RpcClient::new(
        config.node_url.clone(),
        Auth::new(config.user.clone(), config.pass.clone()),
        config.rpc_timeout,
    ));
    let assembler = BlockAssembler::new(config.payout.clone()).with_miner_tag(&config.miner_tag);
    let engine = SearchEngine::new(config.threads);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupt received, shutting down");
                    shutdown.cancel();
                }
                Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
            }
        });
    }

    let stats = Orchestrator::new(node, assembler, engine, config.poll_interval, shutdown)
        .run()
        .await;

    info!(
        templates = stats.templates_delivered,
        failed_polls = stats.failed_polls,
        blocks_found = stats.blocks_found,
        stale_results = stats.stale_results,
        "final statistics"
    );
    Ok(())
}
