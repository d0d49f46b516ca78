//! Scalar quantization with block floating: each BFU shares one scale factor
//! and one word length.

use crate::core::constants::{NUM_SCALE_FACTORS, WORD_LENGTH_BITS};

/// Quantizer/dequantizer with the precomputed 64-entry scale-factor table
/// `SF[i] = 2^(i/3 - 21)`.
pub struct Quantizer {
    sf_table: [f64; NUM_SCALE_FACTORS],
}

impl Quantizer {
    pub fn new() -> Self {
        let mut sf_table = [0.0; NUM_SCALE_FACTORS];
        for (i, sf) in sf_table.iter_mut().enumerate() {
            *sf = 2f64.powf(i as f64 / 3.0 - 21.0);
        }
        Quantizer { sf_table }
    }

    pub fn scale_factor(&self, index: usize) -> f64 {
        self.sf_table[index]
    }

    /// Smallest index whose scale factor covers `max |c|`. Returns 0 for a
    /// silent group (index 0 mutes the BFU on both paths) and saturates at 63
    /// for peaks beyond the table; the quantizer clip absorbs the overshoot.
    pub fn find_scale_factor(&self, coeffs: &[f32]) -> u8 {
        let max = coeffs.iter().fold(0.0f64, |m, &c| m.max((c as f64).abs()));
        if max == 0.0 {
            return 0;
        }
        self.sf_table
            .iter()
            .position(|&sf| sf >= max)
            .unwrap_or(NUM_SCALE_FACTORS - 1) as u8
    }

    /// Quantize one BFU. A word-length index of 0 or scale-factor index of 0
    /// produces all zeros.
    pub fn quantize(&self, coeffs: &[f32], sf_index: u8, word_length: u8, out: &mut [i32]) {
        debug_assert_eq!(coeffs.len(), out.len());
        let bits = WORD_LENGTH_BITS[word_length as usize];
        if bits == 0 || sf_index == 0 {
            out.fill(0);
            return;
        }

        let q_range = ((1i64 << (bits - 1)) - 1) as f64;
        let sf = self.sf_table[sf_index as usize];
        let lo = -(q_range as i64) - 1;
        let hi = q_range as i64;
        for (q, &c) in out.iter_mut().zip(coeffs.iter()) {
            let scaled = (c as f64 * q_range / sf).round() as i64;
            *q = scaled.clamp(lo, hi) as i32;
        }
    }

    /// Inverse of [`quantize`](Self::quantize).
    pub fn dequantize(&self, quantized: &[i32], sf_index: u8, word_length: u8, out: &mut [f32]) {
        debug_assert_eq!(quantized.len(), out.len());
        let bits = WORD_LENGTH_BITS[word_length as usize];
        if bits == 0 || sf_index == 0 {
            out.fill(0.0);
            return;
        }

        let q_range = ((1i64 << (bits - 1)) - 1) as f64;
        let sf = self.sf_table[sf_index as usize];
        for (c, &q) in out.iter_mut().zip(quantized.iter()) {
            *c = (q as f64 * sf / q_range) as f32;
        }
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_table_shape() {
        let q = Quantizer::new();
        assert!((q.scale_factor(63) - 1.0).abs() < 1e-12);
        assert!((q.scale_factor(0) - 2f64.powi(-21)).abs() < 1e-18);
        // Each step is a third of an octave.
        for i in 1..NUM_SCALE_FACTORS {
            let ratio = q.scale_factor(i) / q.scale_factor(i - 1);
            assert!((ratio - 2f64.powf(1.0 / 3.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn scale_factor_search() {
        let q = Quantizer::new();
        assert_eq!(q.find_scale_factor(&[0.0, 0.0]), 0);
        assert_eq!(q.find_scale_factor(&[0.9, -0.5]), 63);
        // A peak beyond the table saturates rather than failing.
        assert_eq!(q.find_scale_factor(&[1.7]), 63);

        let idx = q.find_scale_factor(&[0.25]);
        assert!(q.scale_factor(idx as usize) >= 0.25);
        assert!(idx == 0 || q.scale_factor(idx as usize - 1) < 0.25);
    }

    #[test]
    fn quantize_round_trip_error_is_bounded() {
        let q = Quantizer::new();
        let coeffs = [0.5f32, -0.25, 0.124, -0.9, 0.0, 0.003];
        let sf = q.find_scale_factor(&coeffs);
        let wl = 8u8; // 9-bit words

        let mut ints = [0i32; 6];
        q.quantize(&coeffs, sf, wl, &mut ints);
        let mut back = [0f32; 6];
        q.dequantize(&ints, sf, wl, &mut back);

        let step = q.scale_factor(sf as usize) / 255.0;
        for (a, b) in coeffs.iter().zip(back.iter()) {
            assert!((a - b).abs() as f64 <= step, "{} vs {}", a, b);
        }
    }

    #[test]
    fn degenerate_groups_are_silent() {
        let q = Quantizer::new();
        let coeffs = [0.5f32; 4];
        let mut ints = [7i32; 4];
        q.quantize(&coeffs, 0, 8, &mut ints);
        assert_eq!(ints, [0; 4]);

        q.quantize(&coeffs, 30, 0, &mut ints);
        assert_eq!(ints, [0; 4]);

        let mut back = [1.0f32; 4];
        q.dequantize(&[3, 3, 3, 3], 30, 0, &mut back);
        assert_eq!(back, [0.0; 4]);
    }

    #[test]
    fn clipping_at_field_width() {
        let q = Quantizer::new();
        // sf index 60 -> SF = 0.5; a coefficient at 1.0 overshoots 2x.
        let mut ints = [0i32; 1];
        q.quantize(&[1.0], 60, 1, &mut ints); // 2-bit words, range [-2, 1]
        assert_eq!(ints[0], 1);
        q.quantize(&[-1.0], 60, 1, &mut ints);
        assert_eq!(ints[0], -2);
    }
}
