//! Typed view of a node's `getblocktemplate` result.
//!
//! Hash-like fields are kept in the byte order the node prints them
//! (display order); the block assembler reverses them into header order.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::difficulty::bits_to_target;

/// A template that cannot be mined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A required field is missing or has the wrong JSON type.
    #[error("malformed template: {0}")]
    Malformed(String),
    /// A hex field does not decode to the expected number of bytes.
    #[error("malformed template: field `{field}` {reason}")]
    InvalidHex { field: &'static str, reason: String },
    /// The height does not fit the 3-byte BIP34 push.
    #[error("malformed template: height {0} does not fit a 3-byte BIP34 push")]
    HeightOutOfRange(u64),
}

/// A transaction the node wants included after the coinbase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTransaction {
    /// Transaction id in display order.
    pub txid: [u8; 32],
    /// Raw serialized transaction.
    pub data: Vec<u8>,
}

/// Mining work as delivered by the node. Never mutated once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub height: u64,
    pub version: u32,
    /// Previous block hash in display order.
    pub previous_block_hash: [u8; 32],
    pub cur_time: u32,
    /// Compact target as the node prints it (big-endian).
    pub bits: [u8; 4],
    pub coinbase_value: u64,
    /// 256-bit target, big-endian as printed by the node.
    pub target: [u8; 32],
    /// Transactions in the order they must appear in the block.
    pub transactions: Vec<TemplateTransaction>,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    height: u64,
    version: u32,
    previousblockhash: String,
    curtime: u32,
    bits: String,
    coinbasevalue: u64,
    target: Option<String>,
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    txid: String,
    data: String,
}

impl BlockTemplate {
    /// Parse the `result` object of a `getblocktemplate` response.
    pub fn from_rpc(result: Value) -> Result<Self, TemplateError> {
        let raw: RawTemplate =
            serde_json::from_value(result).map_err(|e| TemplateError::Malformed(e.to_string()))?;

        let bits = decode_fixed::<4>("bits", &raw.bits)?;
        let target = match raw.target {
            Some(target) => decode_fixed::<32>("target", &target)?,
            None => bits_to_target(u32::from_be_bytes(bits)),
        };

        let transactions = raw
            .transactions
            .into_iter()
            .map(|tx| {
                Ok(TemplateTransaction {
                    txid: decode_fixed::<32>("transactions.txid", &tx.txid)?,
                    data: hex::decode(&tx.data).map_err(|e| TemplateError::InvalidHex {
                        field: "transactions.data",
                        reason: e.to_string(),
                    })?,
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        Ok(BlockTemplate {
            height: raw.height,
            version: raw.version,
            previous_block_hash: decode_fixed::<32>("previousblockhash", &raw.previousblockhash)?,
            cur_time: raw.curtime,
            bits,
            coinbase_value: raw.coinbasevalue,
            target,
            transactions,
        })
    }

    /// The identity used to decide whether a newer template is materially
    /// different: (height, transaction count).
    pub fn dedup_key(&self) -> (u64, usize) {
        (self.height, self.transactions.len())
    }
}

fn decode_fixed<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], TemplateError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out).map_err(|e| TemplateError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    Ok(out)
}
