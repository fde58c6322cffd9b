//! Coinbase transaction construction.
//!
//! The coinbase transaction is the first transaction in a block. It has no
//! real input and pays the block reward (subsidy + fees) to the miner.

use crate::address::PayoutAddress;
use crate::codec::encode_compact_size;
use crate::hash::double_sha256;
use crate::network::{
    COINBASE_TX_VERSION, DEFAULT_MINER_TAG, HEIGHT_PUSH_SIZE, MAX_COINBASE_SCRIPTSIG_SIZE,
    MAX_PUSHABLE_HEIGHT,
};
use crate::template::TemplateError;

/// Longest miner tag that keeps the scriptSig within consensus limits.
pub const MAX_MINER_TAG_SIZE: usize = MAX_COINBASE_SCRIPTSIG_SIZE - HEIGHT_PUSH_SIZE;

/// Builder for constructing coinbase transactions.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    /// The block height (required by BIP34).
    block_height: u64,
    /// The address to receive the block reward.
    payout: PayoutAddress,
    /// Arbitrary bytes appended after the height push.
    miner_tag: Vec<u8>,
}

impl CoinbaseBuilder {
    /// Create a new coinbase builder with the default miner tag.
    pub fn new(block_height: u64, payout: PayoutAddress) -> Self {
        CoinbaseBuilder {
            block_height,
            payout,
            miner_tag: DEFAULT_MINER_TAG.as_bytes().to_vec(),
        }
    }

    /// Set the miner tag, truncated to [`MAX_MINER_TAG_SIZE`].
    pub fn with_miner_tag(mut self, tag: &[u8]) -> Self {
        self.miner_tag = tag[..tag.len().min(MAX_MINER_TAG_SIZE)].to_vec();
        self
    }

    /// Build the coinbase transaction paying `coinbase_value`.
    pub fn build(&self, coinbase_value: u64) -> Result<CoinbaseTransaction, TemplateError> {
        let script_sig = self.build_script_sig()?;
        let script_pubkey = self.payout.script_pubkey();

        let mut raw_tx = Vec::with_capacity(64 + script_sig.len() + script_pubkey.len());

        // Version (4 bytes, little-endian)
        raw_tx.extend_from_slice(&COINBASE_TX_VERSION.to_le_bytes());

        // Input count - always 1 for coinbase
        raw_tx.push(0x01);

        // Input: null previous output
        raw_tx.extend_from_slice(&[0u8; 32]);
        raw_tx.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());

        // ScriptSig
        encode_compact_size(script_sig.len() as u64, &mut raw_tx);
        raw_tx.extend_from_slice(&script_sig);

        // Sequence
        raw_tx.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());

        // Single output: reward to the payout address
        raw_tx.push(0x01);
        raw_tx.extend_from_slice(&coinbase_value.to_le_bytes());
        encode_compact_size(script_pubkey.len() as u64, &mut raw_tx);
        raw_tx.extend_from_slice(&script_pubkey);

        // Locktime
        raw_tx.extend_from_slice(&0u32.to_le_bytes());

        let txid = double_sha256(&raw_tx);

        Ok(CoinbaseTransaction { raw_tx, txid })
    }

    /// Build the scriptSig: BIP34 height push followed by the miner tag.
    fn build_script_sig(&self) -> Result<Vec<u8>, TemplateError> {
        let height_bytes = encode_block_height(self.block_height)?;

        let mut script_sig = Vec::with_capacity(HEIGHT_PUSH_SIZE + self.miner_tag.len());
        script_sig.push(height_bytes.len() as u8); // Push opcode
        script_sig.extend_from_slice(&height_bytes);
        script_sig.extend_from_slice(&self.miner_tag);

        Ok(script_sig)
    }
}

/// A constructed coinbase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseTransaction {
    /// Serialized transaction.
    pub raw_tx: Vec<u8>,
    /// Transaction ID (double SHA256 of raw_tx), internal byte order.
    pub txid: [u8; 32],
}

/// Encode a block height as the three low-order little-endian bytes.
fn encode_block_height(height: u64) -> Result<[u8; 3], TemplateError> {
    if height > MAX_PUSHABLE_HEIGHT {
        return Err(TemplateError::HeightOutOfRange(height));
    }
    let le = height.to_le_bytes();
    Ok([le[0], le[1], le[2]])
}
