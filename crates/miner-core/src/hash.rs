//! Double-SHA256 and Scrypt hashing.

use scrypt::Params;
use sha2::{Digest, Sha256};

/// log2 of the Scrypt cost parameter N (N = 1024).
pub const SCRYPT_LOG_N: u8 = 10;
/// Scrypt block size parameter r.
pub const SCRYPT_R: u32 = 1;
/// Scrypt parallelization parameter p.
pub const SCRYPT_P: u32 = 1;

/// SHA256(SHA256(data)).
///
/// Used for transaction IDs, the merkle tree and Base58Check checksums.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// The proof-of-work hash: scrypt(N=1024, r=1, p=1) with the input used as
/// both password and salt, 32-byte output.
pub fn scrypt_hash(data: &[u8]) -> [u8; 32] {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, 32)
        .expect("constant scrypt parameters are valid");
    let mut output = [0u8; 32];
    scrypt::scrypt(data, data, &params, &mut output)
        .expect("32-byte scrypt output length is valid");
    output
}

/// Convert an internal-order hash to its display hex (reversed).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(crate::codec::reverse_bytes(hash))
}
