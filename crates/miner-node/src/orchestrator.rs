//! The mining loop: poll the node, supersede stale work, search, submit.
//!
//! Each delivered template gets a new generation number and a search task
//! with its own cancellation token. Delivering a newer template cancels the
//! previous search before the next one starts, and any result that still
//! arrives for an older generation is discarded. Submissions run as
//! detached tasks so a slow node never stalls polling.

use std::sync::Arc;
use std::time::Duration;

use miner_core::difficulty::{format_difficulty, target_to_difficulty};
use miner_core::hash::hash_to_display_hex;
use miner_core::{
    double_sha256, BlockAssembler, BlockTemplate, CancelFlag, CandidateBlock, MiningResult,
    SearchEngine, SearchOutcome, SearchReport,
};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::dedup::TemplateDeduplicator;
use crate::rpc::{NodeClient, SubmitOutcome};
use crate::stats::{format_hash_rate, hash_rate, MiningStats};

/// A finished search task, reported back to the loop.
#[derive(Debug)]
struct SearchEvent {
    candidate: Arc<CandidateBlock>,
    result: Result<SearchReport, JoinError>,
}

#[derive(Debug)]
struct ActiveSearch {
    generation: u64,
    cancel: CancellationToken,
}

/// Drives template polling, search lifecycle and block submission.
pub struct Orchestrator<N: NodeClient> {
    node: Arc<N>,
    assembler: BlockAssembler,
    engine: SearchEngine,
    poll_interval: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    dedup: TemplateDeduplicator,
    stats: MiningStats,
    generation: u64,
    active: Option<ActiveSearch>,
    events_tx: mpsc::UnboundedSender<SearchEvent>,
    events_rx: mpsc::UnboundedReceiver<SearchEvent>,
}

impl<N: NodeClient> Orchestrator<N> {
    pub fn new(
        node: Arc<N>,
        assembler: BlockAssembler,
        engine: SearchEngine,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Orchestrator {
            node,
            assembler,
            engine,
            poll_interval,
            shutdown,
            tracker: TaskTracker::new(),
            dedup: TemplateDeduplicator::new(),
            stats: MiningStats::new(),
            generation: 0,
            active: None,
            events_tx,
            events_rx,
        }
    }

    /// Run until the shutdown token is cancelled, then stop the active
    /// search, wait for in-flight submissions and return the statistics.
    pub async fn run(mut self) -> MiningStats {
        info!(
            network = %self.assembler.payout().network,
            wallet = %self.assembler.payout().display,
            workers = self.engine.workers(),
            "miner started"
        );

        let mut next_poll = Instant::now() + self.poll_interval;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                Some(event) = self.events_rx.recv() => self.handle_search_event(event),
                _ = tokio::time::sleep_until(next_poll) => {
                    self.poll().await;
                    next_poll = Instant::now() + self.poll_interval;
                }
            }
        }

        self.shut_down().await;
        info!(
            templates = self.stats.templates_delivered,
            blocks_found = self.stats.blocks_found,
            hashes = self.stats.total_hashes,
            "miner stopped"
        );
        self.stats
    }

    /// One poll cycle. Every failure is logged and ends the cycle.
    async fn poll(&mut self) {
        let response = tokio::select! {
            _ = self.shutdown.cancelled() => return,
            response = self.node.get_block_template() => response,
        };

        let result = match response {
            Ok(result) => result,
            Err(e) => {
                self.stats.failed_polls += 1;
                if e.is_network() {
                    warn!(error = %e, "node unreachable");
                } else {
                    warn!(error = %e, "getblocktemplate failed");
                }
                return;
            }
        };

        let template = match BlockTemplate::from_rpc(result) {
            Ok(template) => template,
            Err(e) => {
                self.stats.failed_polls += 1;
                warn!(error = %e, "ignoring template");
                return;
            }
        };

        if !self.dedup.offer(&template) {
            debug!(height = template.height, "template unchanged");
            return;
        }

        self.deliver(template);
    }

    /// Supersede the current search with one for `template`.
    fn deliver(&mut self, template: BlockTemplate) {
        self.generation += 1;
        let generation = self.generation;

        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
            debug!(generation = previous.generation, "superseded search cancelled");
        }

        let candidate = match self.assembler.assemble(&template, generation) {
            Ok(candidate) => candidate,
            Err(e) => {
                self.stats.failed_polls += 1;
                warn!(height = template.height, error = %e, "cannot assemble block");
                return;
            }
        };

        self.stats.templates_delivered += 1;
        info!(
            height = template.height,
            generation,
            transactions = template.transactions.len(),
            difficulty = %format_difficulty(target_to_difficulty(&template.target)),
            "new template"
        );

        self.spawn_search(Arc::new(candidate));
    }

    fn spawn_search(&mut self, candidate: Arc<CandidateBlock>) {
        let cancel = self.shutdown.child_token();
        let token = cancel.clone();
        let engine = self.engine;
        let events = self.events_tx.clone();
        let generation = candidate.generation;

        self.tracker.spawn(async move {
            let flag = CancelFlag::new();
            let mut search = {
                let flag = flag.clone();
                let candidate = Arc::clone(&candidate);
                tokio::task::spawn_blocking(move || engine.search(&candidate, &flag))
            };

            let result = tokio::select! {
                result = &mut search => result,
                _ = token.cancelled() => {
                    flag.cancel();
                    search.await
                }
            };

            // The loop may already be gone during shutdown
            let _ = events.send(SearchEvent { candidate, result });
        });

        self.active = Some(ActiveSearch { generation, cancel });
    }

    fn handle_search_event(&mut self, event: SearchEvent) {
        let SearchEvent { candidate, result } = event;
        let generation = candidate.generation;
        let is_current = self
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!(generation, error = %e, "search task failed");
                if is_current {
                    self.active = None;
                }
                return;
            }
        };

        self.stats.record_search(&report);
        debug!(
            generation,
            hashes = report.hashes,
            rate = %format_hash_rate(hash_rate(report.hashes, report.elapsed)),
            "search finished"
        );

        match report.outcome {
            SearchOutcome::Found(result) => {
                if !is_current || result.generation != self.generation {
                    self.stats.stale_results += 1;
                    info!(
                        generation = result.generation,
                        nonce = result.nonce,
                        "discarding result for superseded template"
                    );
                    return;
                }
                self.active = None;
                self.stats.blocks_found += 1;
                self.submit(&candidate, result);
            }
            SearchOutcome::Exhausted => {
                if is_current {
                    self.active = None;
                    self.stats.searches_exhausted += 1;
                    warn!(height = candidate.height, generation, "nonce space exhausted");
                }
            }
            SearchOutcome::Cancelled => {
                debug!(generation, "search cancelled");
            }
        }
    }

    /// Submit without waiting for the node's answer.
    fn submit(&self, candidate: &CandidateBlock, result: MiningResult) {
        let block_hex = candidate.serialize_block_hex(result.nonce);
        let block_hash = hash_to_display_hex(&double_sha256(&candidate.header(result.nonce)));
        let height = candidate.height;
        let node = Arc::clone(&self.node);

        info!(height, nonce = result.nonce, hash = %block_hash, "block found, submitting");

        self.tracker.spawn(async move {
            match node.submit_block(block_hex).await {
                Ok(SubmitOutcome::Accepted) => {
                    info!(height, hash = %block_hash, "block accepted");
                }
                Ok(SubmitOutcome::Rejected(reason)) => {
                    warn!(height, hash = %block_hash, %reason, "block rejected");
                }
                Err(e) => {
                    error!(height, hash = %block_hash, error = %e, "block submission failed");
                }
            }
        });
    }

    async fn shut_down(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
        self.events_rx.close();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
