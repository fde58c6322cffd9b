//! Candidate block assembly and serialization.

use crate::address::PayoutAddress;
use crate::codec::{encode_compact_size, reverse_bytes};
use crate::coinbase::{CoinbaseBuilder, CoinbaseTransaction};
use crate::merkle::compute_merkle_root;
use crate::network::{BLOCK_HEADER_SIZE, DEFAULT_MINER_TAG, HEADER_PREFIX_SIZE};
use crate::template::{BlockTemplate, TemplateError};

/// A block ready for nonce search.
///
/// Derived from one template; immutable and discarded when a newer template
/// supersedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBlock {
    /// Header without the trailing nonce: version, prev hash, merkle root,
    /// time, bits.
    pub header_prefix: [u8; HEADER_PREFIX_SIZE],
    /// Transaction count, coinbase and template transactions.
    pub body_suffix: Vec<u8>,
    /// Proof-of-work target, little-endian.
    pub target: [u8; 32],
    /// Identifies the template delivery this candidate was built for.
    pub generation: u64,
    /// Height of the block being mined.
    pub height: u64,
}

impl CandidateBlock {
    /// The full 80-byte header for `nonce`.
    pub fn header(&self, nonce: u32) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[..HEADER_PREFIX_SIZE].copy_from_slice(&self.header_prefix);
        header[HEADER_PREFIX_SIZE..].copy_from_slice(&nonce.to_le_bytes());
        header
    }

    /// Serialize the complete block: header prefix, nonce, body.
    pub fn serialize_block(&self, nonce: u32) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + self.body_suffix.len());
        block.extend_from_slice(&self.header(nonce));
        block.extend_from_slice(&self.body_suffix);
        block
    }

    /// Get the block as hex string for `submitblock`.
    pub fn serialize_block_hex(&self, nonce: u32) -> String {
        hex::encode(self.serialize_block(nonce))
    }
}

/// Builds candidate blocks for one payout address.
#[derive(Debug, Clone)]
pub struct BlockAssembler {
    payout: PayoutAddress,
    miner_tag: Vec<u8>,
}

impl BlockAssembler {
    /// Create an assembler paying to `payout` with the default miner tag.
    pub fn new(payout: PayoutAddress) -> Self {
        BlockAssembler {
            payout,
            miner_tag: DEFAULT_MINER_TAG.as_bytes().to_vec(),
        }
    }

    /// Set the bytes appended to the coinbase scriptSig.
    pub fn with_miner_tag(mut self, tag: &[u8]) -> Self {
        self.miner_tag = tag.to_vec();
        self
    }

    /// The address block rewards are paid to.
    pub fn payout(&self) -> &PayoutAddress {
        &self.payout
    }

    /// Build the coinbase transaction for `template`.
    pub fn build_coinbase_transaction(
        &self,
        template: &BlockTemplate,
    ) -> Result<CoinbaseTransaction, TemplateError> {
        CoinbaseBuilder::new(template.height, self.payout.clone())
            .with_miner_tag(&self.miner_tag)
            .build(template.coinbase_value)
    }

    /// Assemble the candidate block for `template`, tagged with `generation`.
    pub fn assemble(
        &self,
        template: &BlockTemplate,
        generation: u64,
    ) -> Result<CandidateBlock, TemplateError> {
        let coinbase = self.build_coinbase_transaction(template)?;

        // Coinbase-only blocks use the coinbase txid as the root directly
        let merkle_root = if template.transactions.is_empty() {
            coinbase.txid
        } else {
            let leaves: Vec<[u8; 32]> = std::iter::once(coinbase.txid)
                .chain(template.transactions.iter().map(|tx| reverse_bytes(&tx.txid)))
                .collect();
            compute_merkle_root(&leaves)
        };

        let mut header_prefix = [0u8; HEADER_PREFIX_SIZE];
        header_prefix[0..4].copy_from_slice(&template.version.to_le_bytes());
        header_prefix[4..36].copy_from_slice(&reverse_bytes(&template.previous_block_hash));
        header_prefix[36..68].copy_from_slice(&merkle_root);
        header_prefix[68..72].copy_from_slice(&template.cur_time.to_le_bytes());
        let mut bits = template.bits;
        bits.reverse();
        header_prefix[72..76].copy_from_slice(&bits);

        let tx_bytes: usize = template.transactions.iter().map(|tx| tx.data.len()).sum();
        let mut body_suffix = Vec::with_capacity(9 + coinbase.raw_tx.len() + tx_bytes);
        encode_compact_size(1 + template.transactions.len() as u64, &mut body_suffix);
        body_suffix.extend_from_slice(&coinbase.raw_tx);
        for tx in &template.transactions {
            body_suffix.extend_from_slice(&tx.data);
        }

        Ok(CandidateBlock {
            header_prefix,
            body_suffix,
            target: reverse_bytes(&template.target),
            generation,
            height: template.height,
        })
    }
}
