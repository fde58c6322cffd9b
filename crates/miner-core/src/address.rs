//! Payout address decoding and scriptPubKey generation.
//!
//! The coinbase pays to a standard P2PKH script, so the payout wallet must
//! be a Base58Check P2PKH address on one of the known Scrypt chains. The
//! 20-byte payload is the address's hash160.

use thiserror::Error;

use crate::hash::double_sha256;
use crate::network::Network;

/// Why a wallet address could not be resolved to a 20-byte hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid wallet address: empty")]
    Empty,
    #[error("invalid wallet address: bad Base58 character {0:?}")]
    InvalidBase58Char(char),
    #[error("invalid wallet address: checksum mismatch")]
    InvalidChecksum,
    #[error("invalid wallet address: payload is {0} bytes, expected 21")]
    InvalidLength(usize),
    #[error("invalid wallet address: P2SH addresses cannot receive a P2PKH coinbase")]
    UnsupportedType,
    #[error("invalid wallet address: unknown version byte {0:#04x}")]
    UnknownVersion(u8),
}

/// A validated payout address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutAddress {
    /// The chain this address belongs to.
    pub network: Network,
    /// hash160 of the public key, taken from the address payload.
    pub pubkey_hash: [u8; 20],
    /// The original address string.
    pub display: String,
}

impl PayoutAddress {
    /// Decode and validate a P2PKH address.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let payload = decode_base58check(trimmed)?;
        if payload.len() != 21 {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        let version = payload[0];
        let network = match Network::from_p2pkh_version(version) {
            Some(network) => network,
            None if Network::is_p2sh_version(version) => return Err(AddressError::UnsupportedType),
            None => return Err(AddressError::UnknownVersion(version)),
        };

        let mut pubkey_hash = [0u8; 20];
        pubkey_hash.copy_from_slice(&payload[1..]);

        Ok(PayoutAddress {
            network,
            pubkey_hash,
            display: trimmed.to_string(),
        })
    }

    /// OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn script_pubkey(&self) -> Vec<u8> {
        let mut script = Vec::with_capacity(25);
        script.push(0x76); // OP_DUP
        script.push(0xa9); // OP_HASH160
        script.push(0x14); // Push 20 bytes
        script.extend_from_slice(&self.pubkey_hash);
        script.push(0x88); // OP_EQUALVERIFY
        script.push(0xac); // OP_CHECKSIG
        script
    }
}

/// Resolve a wallet address string to its 20-byte hash160.
pub fn hash160(address: &str) -> Result<[u8; 20], AddressError> {
    PayoutAddress::parse(address).map(|a| a.pubkey_hash)
}

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Decode Base58Check, verify the 4-byte checksum and return the payload
/// (version byte included).
pub fn decode_base58check(input: &str) -> Result<Vec<u8>, AddressError> {
    let decoded = base58_decode(input)?;

    if decoded.len() < 5 {
        return Err(AddressError::InvalidLength(decoded.len().saturating_sub(4)));
    }

    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    if checksum != &double_sha256(payload)[..4] {
        return Err(AddressError::InvalidChecksum);
    }

    Ok(payload.to_vec())
}

fn base58_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let mut result: Vec<u8> = Vec::new();

    // Leading '1's become leading zero bytes
    let leading_zeros = input.chars().take_while(|&c| c == '1').count();

    for c in input.chars() {
        let value = BASE58_ALPHABET
            .iter()
            .position(|&x| x as char == c)
            .ok_or(AddressError::InvalidBase58Char(c))? as u32;

        // result = result * 58 + value
        let mut carry = value;
        for byte in result.iter_mut().rev() {
            let temp = (*byte as u32) * 58 + carry;
            *byte = (temp & 0xFF) as u8;
            carry = temp >> 8;
        }

        while carry > 0 {
            result.insert(0, (carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut final_result = vec![0u8; leading_zeros];
    final_result.extend(result);

    Ok(final_result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Base58Check-encode `payload`; used to mint addresses for tests.
    pub(crate) fn base58check_encode(payload: &[u8]) -> String {
        let mut data = payload.to_vec();
        data.extend_from_slice(&double_sha256(payload)[..4]);

        let zeros = data.iter().take_while(|&&b| b == 0).count();
        // Base58 digits, least significant first
        let mut digits: Vec<u8> = Vec::new();
        for &byte in &data {
            let mut carry = byte as u32;
            for digit in digits.iter_mut() {
                carry += (*digit as u32) << 8;
                *digit = (carry % 58) as u8;
                carry /= 58;
            }
            while carry > 0 {
                digits.push((carry % 58) as u8);
                carry /= 58;
            }
        }

        let mut encoded = "1".repeat(zeros);
        encoded.extend(digits.iter().rev().map(|&d| BASE58_ALPHABET[d as usize] as char));
        encoded
    }

    /// A Litecoin mainnet P2PKH address paying to `[0x11; 20]`.
    pub(crate) fn litecoin_address() -> String {
        let mut payload = vec![0x30];
        payload.extend_from_slice(&[0x11; 20]);
        base58check_encode(&payload)
    }

    #[test]
    fn test_decode_known_base58check() {
        // The genesis coinbase address
        let payload = decode_base58check("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        assert_eq!(payload[0], 0x00);
        assert_eq!(
            hex::encode(&payload[1..]),
            "62e907b15cbf27d5425399ebf6f0fb50ebb88f18"
        );
    }

    #[test]
    fn test_litecoin_p2pkh() {
        let address = litecoin_address();
        assert!(address.starts_with('L'));

        let parsed = PayoutAddress::parse(&address).unwrap();
        assert_eq!(parsed.network, Network::Litecoin);
        assert_eq!(parsed.pubkey_hash, [0x11; 20]);
        assert_eq!(hash160(&address).unwrap(), [0x11; 20]);
    }

    #[test]
    fn test_script_pubkey_layout() {
        let parsed = PayoutAddress::parse(&litecoin_address()).unwrap();
        let script = parsed.script_pubkey();

        assert_eq!(script.len(), 25);
        assert_eq!(&script[..3], &[0x76, 0xa9, 0x14]);
        assert_eq!(&script[3..23], &[0x11; 20]);
        assert_eq!(&script[23..], &[0x88, 0xac]);
    }

    #[test]
    fn test_p2sh_rejected() {
        let result = PayoutAddress::parse("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy");
        assert_eq!(result, Err(AddressError::UnsupportedType));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let result = PayoutAddress::parse("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2");
        assert_eq!(result, Err(AddressError::UnknownVersion(0x00)));
    }

    #[test]
    fn test_invalid_checksum() {
        let result = PayoutAddress::parse("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN3");
        assert_eq!(result, Err(AddressError::InvalidChecksum));
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(
            PayoutAddress::parse("L0OIl"),
            Err(AddressError::InvalidBase58Char('0'))
        );
        assert_eq!(PayoutAddress::parse("   "), Err(AddressError::Empty));
    }
}
