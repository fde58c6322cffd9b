//! Merkle root computation.

use crate::hash::double_sha256;

/// Compute the merkle root of an ordered list of leaf hashes.
///
/// A single leaf is its own root. An odd level duplicates its last leaf;
/// adjacent pairs are hashed with double SHA256 over their concatenation.
/// An empty list yields the all-zero hash.
pub fn compute_merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut current_level: Vec<[u8; 32]> = leaves.to_vec();

    while current_level.len() > 1 {
        if current_level.len() % 2 == 1 {
            let last = current_level[current_level.len() - 1];
            current_level.push(last);
        }

        current_level = current_level
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }

    current_level[0]
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    double_sha256(&combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_leaf_merkle_root() {
        let txid = [0x42u8; 32];
        assert_eq!(compute_merkle_root(&[txid]), txid);
    }

    #[test]
    fn test_two_leaf_merkle_root() {
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];

        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&tx1);
        combined[32..].copy_from_slice(&tx2);

        assert_eq!(compute_merkle_root(&[tx1, tx2]), double_sha256(&combined));
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        let a = [0x11u8; 32];
        let b = [0x22u8; 32];
        let c = [0x33u8; 32];

        assert_eq!(compute_merkle_root(&[a, b, c]), compute_merkle_root(&[a, b, c, c]));

        // Level 1: hash(a, b), hash(c, c); level 0: hash of those
        let expected = hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &c));
        assert_eq!(compute_merkle_root(&[a, b, c]), expected);
    }

    #[test]
    fn test_odd_duplication_deeper_levels() {
        let leaves: Vec<[u8; 32]> = (1..=5u8).map(|i| [i; 32]).collect();
        let mut padded = leaves.clone();
        padded.push(leaves[4]);

        assert_eq!(compute_merkle_root(&leaves), compute_merkle_root(&padded));
    }

    #[test]
    fn test_leaf_order_matters() {
        let a = [0x01u8; 32];
        let b = [0x02u8; 32];
        let c = [0x03u8; 32];

        assert_ne!(compute_merkle_root(&[a, b]), compute_merkle_root(&[b, a]));
        assert_ne!(compute_merkle_root(&[a, b, c]), compute_merkle_root(&[a, c, b]));
    }

    #[test]
    fn test_empty_leaves() {
        assert_eq!(compute_merkle_root(&[]), [0u8; 32]);
    }
}
