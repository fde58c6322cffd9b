//! Difficulty target conversion and proof-of-work comparison.

/// Compact bits of the difficulty-1 target, as reported by `getdifficulty`.
const DIFFICULTY_1_BITS: u32 = 0x1d00ffff;

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = ((bits >> 24) & 0xFF) as usize;
    let mantissa = bits & 0x007FFFFF;

    let mut target = [0u8; 32];

    // Negative targets and exponent 0 are both zero
    if bits & 0x00800000 != 0 || exponent == 0 {
        return target;
    }

    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        if exponent >= 1 { target[31] = (value & 0xFF) as u8; }
        if exponent >= 2 { target[30] = ((value >> 8) & 0xFF) as u8; }
        if exponent >= 3 { target[29] = ((value >> 16) & 0xFF) as u8; }
    } else if exponent <= 32 {
        let pos = 32 - exponent;
        target[pos] = ((mantissa >> 16) & 0xFF) as u8;
        if pos + 1 < 32 { target[pos + 1] = ((mantissa >> 8) & 0xFF) as u8; }
        if pos + 2 < 32 { target[pos + 2] = (mantissa & 0xFF) as u8; }
    }

    target
}

/// Proof-of-work check: `hash <= target` with both read as 256-bit
/// little-endian integers (index 31 is the most significant byte).
#[inline]
pub fn meets_target_le(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    for i in (0..32).rev() {
        if hash[i] < target[i] {
            return true;
        }
        if hash[i] > target[i] {
            return false;
        }
    }
    // Equal meets the target
    true
}

/// Approximate difficulty of a big-endian target relative to difficulty 1.
pub fn target_to_difficulty(target: &[u8; 32]) -> f64 {
    let current = target_to_f64(target);
    if current == 0.0 {
        return f64::INFINITY;
    }
    target_to_f64(&bits_to_target(DIFFICULTY_1_BITS)) / current
}

/// Convert a big-endian 256-bit target to an approximate f64 value.
fn target_to_f64(target: &[u8; 32]) -> f64 {
    target
        .iter()
        .fold(0.0f64, |acc, &byte| acc * 256.0 + byte as f64)
}

/// Format difficulty for display (e.g., "1.23K").
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.4}", difficulty)
    }
}
