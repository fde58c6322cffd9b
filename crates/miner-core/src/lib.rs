//! Core mining logic for the Scrypt solo miner.
//!
//! This crate provides pure Rust implementations of:
//! - Payout address decoding (Base58Check P2PKH) and chain detection
//! - `getblocktemplate` parsing
//! - Coinbase transaction building with a BIP34 height push
//! - Merkle root computation and candidate block serialization
//! - Scrypt proof-of-work evaluation and the parallel nonce search

pub mod address;
pub mod block;
pub mod codec;
pub mod coinbase;
pub mod difficulty;
pub mod hash;
pub mod merkle;
pub mod network;
pub mod search;
pub mod template;

pub use address::{hash160, AddressError, PayoutAddress};
pub use block::{BlockAssembler, CandidateBlock};
pub use coinbase::{CoinbaseBuilder, CoinbaseTransaction};
pub use difficulty::{bits_to_target, meets_target_le};
pub use hash::{double_sha256, scrypt_hash};
pub use merkle::compute_merkle_root;
pub use network::Network;
pub use search::{
    evaluate_nonce, partition_nonce_space, CancelFlag, MiningResult, SearchEngine, SearchOutcome,
    SearchReport,
};
pub use template::{BlockTemplate, TemplateError, TemplateTransaction};
