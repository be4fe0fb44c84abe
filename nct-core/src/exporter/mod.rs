//! Graph exporters.
//!
//! Only JSON is produced today; the downstream augmentation and attack stages
//! read `graph.json` as an opaque artifact.

pub mod json;

/// Decimal places kept for importance values in exported documents.
pub const IMPORTANCE_DECIMALS: i32 = 4;

/// Round an importance value for export. The in-memory graph keeps full precision.
///
/// Rounds the exact binary value half-to-even, so `1/32` becomes `0.0312`
/// rather than `0.0313`.
pub fn round_importance(value: f64) -> f64 {
    let scale: u128 = 10u128.pow(IMPORTANCE_DECIMALS as u32);
    if !value.is_finite() || value == 0.0 || value.abs() >= 1e11 {
        return value;
    }

    let bits = value.to_bits();
    let negative = bits >> 63 == 1;
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let signed = |v: f64| if negative { -v } else { v };

    // Subnormals are far below the last kept digit
    if biased_exponent == 0 {
        return signed(0.0);
    }

    // value == mantissa * 2^-shift exactly
    let mantissa = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
    let shift = 1075 - biased_exponent;
    if shift <= 0 {
        return value;
    }
    if shift > 120 {
        return signed(0.0);
    }

    let scaled = mantissa as u128 * scale;
    let mut quotient = scaled >> shift;
    let remainder = scaled & ((1u128 << shift) - 1);
    let half = 1u128 << (shift - 1);
    if remainder > half || (remainder == half && quotient & 1 == 1) {
        quotient += 1;
    }

    signed(quotient as f64 / scale as f64)
}
