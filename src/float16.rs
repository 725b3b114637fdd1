//! IEEE 754 half-precision expansion, done by hand on the bit pattern.
//!
//! Layout: bit 15 sign, bits 14..10 exponent (bias 15), bits 9..0 fraction.

const EXPONENT_MASK: u16 = 0x1f;
const FRACTION_MASK: u16 = 0x3ff;
const FRACTION_SCALE: f32 = 1024.0;

/// Expands one float16 bit pattern to `f32`.
pub fn f16_bits_to_f32(bits: u16) -> f32 {
    let sign = if (bits >> 15) & 0x1 == 1 { -1.0f32 } else { 1.0f32 };
    let exponent = (bits >> 10) & EXPONENT_MASK;
    let fraction = bits & FRACTION_MASK;

    match (exponent, fraction) {
        (0, 0) => sign * 0.0,
        // Subnormal
        (0, f) => sign * 2f32.powi(-14) * (f as f32 / FRACTION_SCALE),
        (EXPONENT_MASK, 0) => sign * f32::INFINITY,
        (EXPONENT_MASK, _) => f32::NAN,
        (e, f) => sign * 2f32.powi(e as i32 - 15) * (1.0 + f as f32 / FRACTION_SCALE),
    }
}

/// Elementwise [`f16_bits_to_f32`] over a buffer of raw bit patterns.
pub fn f16_slice_to_f32(bits: &[u16]) -> Vec<f32> {
    bits.iter().map(|b| f16_bits_to_f32(*b)).collect()
}

/// Narrows an `f32` to the nearest float16 bit pattern (ties to even).
///
/// Values beyond the float16 range become infinity; NaN stays NaN.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let x = value.to_bits();
    let sign = ((x >> 16) & 0x8000) as u16;
    let exp = ((x >> 23) & 0xff) as i32;
    let man = x & 0x007f_ffff;

    if exp == 0xff {
        // Inf or NaN; keep NaN quiet and non-zero.
        let nan_bit = if man != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | nan_bit | (man >> 13) as u16;
    }

    let half_exp = exp - 127 + 15;
    if half_exp >= 0x1f {
        return sign | 0x7c00;
    }

    if half_exp <= 0 {
        // Subnormal or underflow to zero.
        if 14 - half_exp > 24 {
            return sign;
        }
        let man = man | 0x0080_0000;
        let shift = (14 - half_exp) as u32;
        let half_man = man >> shift;
        let round_bit = 1u32 << (shift - 1);
        let round_up = (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0;
        return sign | (half_man as u16 + round_up as u16);
    }

    let half = sign | ((half_exp as u16) << 10) | (man >> 13) as u16;
    let round_bit = 0x0000_1000u32;
    if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
        // Carry may roll into the exponent, which is the correct result.
        half + 1
    } else {
        half
    }
}
