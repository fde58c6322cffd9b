//! Parallel nonce search.
//!
//! The nonce space is split into contiguous ranges, one per worker thread.
//! Workers share only immutable inputs. The first winning nonce is stored
//! in a write-once cell and raises a flag that stops the siblings; an
//! external [`CancelFlag`] stops everyone without producing a result. Both
//! are checked before every evaluation.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::block::CandidateBlock;
use crate::difficulty::meets_target_le;
use crate::hash::scrypt_hash;
use crate::network::{BLOCK_HEADER_SIZE, HEADER_PREFIX_SIZE, NONCE_SPACE};

/// Cooperative stop signal shared between a search and whoever may abandon it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker of the search to stop after its current evaluation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A winning nonce and the candidate generation it was found against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiningResult {
    pub nonce: u32,
    pub generation: u64,
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(MiningResult),
    /// Every nonce was tried without success.
    Exhausted,
    /// Stopped by the [`CancelFlag`]; never carries a result.
    Cancelled,
}

/// Outcome plus statistics of one search.
#[derive(Debug, Clone, Copy)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    /// Nonces evaluated across all workers.
    pub hashes: u64,
    pub elapsed: Duration,
}

/// One worker's share of the nonce space.
#[derive(Debug, Clone)]
pub struct SearchJob<'a> {
    pub header_prefix: &'a [u8; HEADER_PREFIX_SIZE],
    pub target: &'a [u8; 32],
    pub nonce_range: Range<u64>,
}

impl SearchJob<'_> {
    /// Scan the range in order. Returns the first winning nonce (if any) and
    /// the number of nonces evaluated.
    fn run<E, S>(&self, evaluate: &E, should_stop: S) -> (Option<u32>, u64)
    where
        E: Fn(&[u8; HEADER_PREFIX_SIZE], u32, &[u8; 32]) -> bool,
        S: Fn() -> bool,
    {
        let mut evaluated = 0u64;
        for nonce in self.nonce_range.clone() {
            if should_stop() {
                break;
            }
            let nonce = nonce as u32;
            evaluated += 1;
            if evaluate(self.header_prefix, nonce, self.target) {
                return (Some(nonce), evaluated);
            }
        }
        (None, evaluated)
    }
}

/// Split `[0, total_space)` into `worker_count` contiguous ranges.
///
/// Sizes differ by at most one; the earliest ranges take the remainder.
/// Ranges are empty when there are more workers than nonces.
pub fn partition_nonce_space(total_space: u64, worker_count: usize) -> Vec<Range<u64>> {
    let workers = worker_count.max(1) as u64;
    let base = total_space / workers;
    let remainder = total_space % workers;

    let mut ranges = Vec::with_capacity(workers as usize);
    let mut start = 0u64;
    for i in 0..workers {
        let len = base + u64::from(i < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Hash `header_prefix || nonce` with scrypt and compare against `target`,
/// both as little-endian 256-bit integers.
pub fn evaluate_nonce(
    header_prefix: &[u8; HEADER_PREFIX_SIZE],
    nonce: u32,
    target: &[u8; 32],
) -> bool {
    let mut header = [0u8; BLOCK_HEADER_SIZE];
    header[..HEADER_PREFIX_SIZE].copy_from_slice(header_prefix);
    header[HEADER_PREFIX_SIZE..].copy_from_slice(&nonce.to_le_bytes());
    meets_target_le(&scrypt_hash(&header), target)
}

/// Runs nonce searches on a fixed number of worker threads.
#[derive(Debug, Clone, Copy)]
pub struct SearchEngine {
    workers: usize,
    nonce_space: u64,
}

impl SearchEngine {
    /// Create an engine with `workers` threads (at least one) over the full
    /// 32-bit nonce space.
    pub fn new(workers: usize) -> Self {
        SearchEngine {
            workers: workers.max(1),
            nonce_space: NONCE_SPACE,
        }
    }

    /// Restrict the search to `[0, space)`.
    pub fn with_nonce_space(mut self, space: u64) -> Self {
        self.nonce_space = space.min(NONCE_SPACE);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Search `candidate` until a worker wins, the space is exhausted, or
    /// `cancel` is raised. Blocks the calling thread.
    pub fn search(&self, candidate: &CandidateBlock, cancel: &CancelFlag) -> SearchReport {
        self.search_with(candidate, cancel, &evaluate_nonce)
    }

    fn search_with<E>(
        &self,
        candidate: &CandidateBlock,
        cancel: &CancelFlag,
        evaluate: &E,
    ) -> SearchReport
    where
        E: Fn(&[u8; HEADER_PREFIX_SIZE], u32, &[u8; 32]) -> bool + Sync,
    {
        let started = Instant::now();
        let winner: OnceLock<u32> = OnceLock::new();
        let found = AtomicBool::new(false);
        let hashes = AtomicU64::new(0);

        let jobs: Vec<SearchJob<'_>> = partition_nonce_space(self.nonce_space, self.workers)
            .into_iter()
            .map(|nonce_range| SearchJob {
                header_prefix: &candidate.header_prefix,
                target: &candidate.target,
                nonce_range,
            })
            .collect();

        std::thread::scope(|scope| {
            for job in &jobs {
                let (winner, found, hashes) = (&winner, &found, &hashes);
                scope.spawn(move || {
                    let should_stop = || found.load(Ordering::Acquire) || cancel.is_cancelled();
                    let (nonce, evaluated) = job.run(evaluate, should_stop);
                    hashes.fetch_add(evaluated, Ordering::Relaxed);
                    if let Some(nonce) = nonce {
                        // First writer wins; later winners are dropped
                        if winner.set(nonce).is_ok() {
                            found.store(true, Ordering::Release);
                        }
                    }
                });
            }
        });

        let outcome = if cancel.is_cancelled() {
            SearchOutcome::Cancelled
        } else {
            match winner.get() {
                Some(&nonce) => SearchOutcome::Found(MiningResult {
                    nonce,
                    generation: candidate.generation,
                }),
                None => SearchOutcome::Exhausted,
            }
        };

        SearchReport {
            outcome,
            hashes: hashes.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        }
    }
}
