//! Byte-level encoding helpers shared by the block and transaction builders.

/// Encode a compact-size length prefix (Bitcoin-style varint).
pub fn encode_compact_size(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Reverse the byte order of a 32-byte array.
///
/// Node RPC output shows hashes in display order; headers and merkle leaves
/// use the reversed (internal) order.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact_size(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact_size(value, &mut out);
        out
    }

    #[test]
    fn test_compact_size_boundaries() {
        assert_eq!(compact_size(0), vec![0x00]);
        assert_eq!(compact_size(0xfc), vec![0xfc]);
        assert_eq!(compact_size(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_size(0x1234), vec![0xfd, 0x34, 0x12]);
        assert_eq!(compact_size(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(
            compact_size(0x1_0000_0000),
            vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_reverse_bytes() {
        let mut original = [0u8; 32];
        for (i, b) in original.iter_mut().enumerate() {
            *b = i as u8 + 1;
        }
        let reversed = reverse_bytes(&original);

        assert_eq!(reversed[0], 0x20);
        assert_eq!(reversed[31], 0x01);
    }
}
