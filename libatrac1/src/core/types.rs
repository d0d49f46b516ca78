//! Logical frame types shared by the encoder, decoder and serializer.

use serde::Serialize;

use crate::core::constants::{BFU_SIZES, MAX_BFUS, WORD_LENGTH_BITS};
use crate::error::{AtracError, AtracResult};

/// Transform length selection for one QMF band.
///
/// Long mode runs a single MDCT over the whole band; short mode splits the
/// band into 32-sample blocks (4 for low/mid, 8 for high) for better time
/// resolution around transients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockMode {
    Long,
    Short,
}

impl BlockMode {
    /// log2 of the number of MDCT blocks this mode uses in `band`.
    pub fn log_count(self, band: usize) -> u8 {
        match self {
            BlockMode::Long => 0,
            BlockMode::Short => {
                if band == 2 {
                    3
                } else {
                    2
                }
            }
        }
    }

    /// Number of MDCT blocks in `band` under this mode.
    pub fn block_count(self, band: usize) -> usize {
        1 << self.log_count(band)
    }
}

/// Per-band block modes of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockModes {
    pub low: BlockMode,
    pub mid: BlockMode,
    pub high: BlockMode,
}

impl BlockModes {
    pub const ALL_LONG: BlockModes = BlockModes {
        low: BlockMode::Long,
        mid: BlockMode::Long,
        high: BlockMode::Long,
    };

    pub fn mode(&self, band: usize) -> BlockMode {
        match band {
            0 => self.low,
            1 => self.mid,
            _ => self.high,
        }
    }

    /// Wire encoding of one band's mode: the header stores `2 - log_count`
    /// for low/mid and `3 - log_count` for high.
    pub fn wire_code(&self, band: usize) -> u32 {
        let max_log = if band == 2 { 3 } else { 2 };
        (max_log - self.mode(band).log_count(band)) as u32
    }

    /// Start offset of BFU `i` in the spectrum under these modes: each
    /// band's mode picks the long or short start table.
    pub fn bfu_start(&self, i: usize) -> usize {
        use crate::core::constants::{bfu_band, BFU_START_LONG, BFU_START_SHORT};
        match self.mode(bfu_band(i)) {
            BlockMode::Long => BFU_START_LONG[i],
            BlockMode::Short => BFU_START_SHORT[i],
        }
    }

    /// Inverse of [`wire_code`](Self::wire_code). Only 0 encodes short mode;
    /// any other remainder is long.
    pub fn from_wire_codes(low: u32, mid: u32, high: u32) -> BlockModes {
        let decode = |code: u32| {
            if code == 0 {
                BlockMode::Short
            } else {
                BlockMode::Long
            }
        };
        BlockModes {
            low: decode(low),
            mid: decode(mid),
            high: decode(high),
        }
    }
}

/// One encoded frame in logical (unpacked) form.
///
/// The vectors run over the active BFUs only; BFUs past `n_bfu()` are
/// implicitly silent. A word-length index of 0 means the BFU carries no
/// coefficient data and its `coefficients` entry is all zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedFrame {
    pub block_modes: BlockModes,
    /// Word-length indices, one per active BFU, each in 0..=15.
    pub word_lengths: Vec<u8>,
    /// Scale-factor indices, one per active BFU, each in 0..=63.
    pub scale_factors: Vec<u8>,
    /// Quantized coefficients grouped per BFU.
    pub coefficients: Vec<Vec<i32>>,
}

impl EncodedFrame {
    /// Number of active BFUs.
    pub fn n_bfu(&self) -> usize {
        self.word_lengths.len()
    }

    /// A frame decoding to pure silence.
    pub fn silence(n_bfu: usize) -> EncodedFrame {
        let n = n_bfu.min(MAX_BFUS);
        EncodedFrame {
            block_modes: BlockModes::ALL_LONG,
            word_lengths: vec![0; n],
            scale_factors: vec![0; n],
            coefficients: (0..n).map(|i| vec![0; BFU_SIZES[i]]).collect(),
        }
    }

    /// Bits this frame spends on coefficient data.
    pub fn data_bits(&self) -> usize {
        self.word_lengths
            .iter()
            .enumerate()
            .map(|(i, &wl)| WORD_LENGTH_BITS[wl as usize] as usize * BFU_SIZES[i])
            .sum()
    }
}

/// Encoder tuning knobs, validated at encoder construction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EncoderOptions {
    /// Transient score threshold for the low band, in 0.01..=2.
    pub transient_threshold_low: f32,
    /// Transient score threshold for the mid band, in 0.01..=3.
    pub transient_threshold_mid: f32,
    /// Transient score threshold for the high band, in 0.01..=4.
    pub transient_threshold_high: f32,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            transient_threshold_low: 1.0,
            transient_threshold_mid: 1.5,
            transient_threshold_high: 2.0,
        }
    }
}

impl EncoderOptions {
    pub fn with_transient_thresholds(mut self, low: f32, mid: f32, high: f32) -> Self {
        self.transient_threshold_low = low;
        self.transient_threshold_mid = mid;
        self.transient_threshold_high = high;
        self
    }

    pub fn validate(&self) -> AtracResult<()> {
        let checks = [
            ("transientThresholdLow", self.transient_threshold_low, 2.0),
            ("transientThresholdMid", self.transient_threshold_mid, 3.0),
            ("transientThresholdHigh", self.transient_threshold_high, 4.0),
        ];
        for (name, value, max) in checks {
            if !value.is_finite() || value < 0.01 || value > max {
                return Err(AtracError::InvalidOption(format!(
                    "{} must be in 0.01..={}, got {}",
                    name, max, value
                )));
            }
        }
        Ok(())
    }

    /// Threshold for `band` (0 = low, 1 = mid, 2 = high).
    pub fn transient_threshold(&self, band: usize) -> f32 {
        match band {
            0 => self.transient_threshold_low,
            1 => self.transient_threshold_mid,
            _ => self.transient_threshold_high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_round_trip() {
        for modes in [
            BlockModes::ALL_LONG,
            BlockModes {
                low: BlockMode::Short,
                mid: BlockMode::Long,
                high: BlockMode::Short,
            },
        ] {
            let decoded = BlockModes::from_wire_codes(
                modes.wire_code(0),
                modes.wire_code(1),
                modes.wire_code(2),
            );
            assert_eq!(decoded, modes);
        }

        // Long stores 2/2/3, short stores 0.
        assert_eq!(BlockModes::ALL_LONG.wire_code(0), 2);
        assert_eq!(BlockModes::ALL_LONG.wire_code(1), 2);
        assert_eq!(BlockModes::ALL_LONG.wire_code(2), 3);
    }

    #[test]
    fn options_validation() {
        assert!(EncoderOptions::default().validate().is_ok());

        let bad = EncoderOptions::default().with_transient_thresholds(0.0, 1.5, 2.0);
        assert!(matches!(bad.validate(), Err(AtracError::InvalidOption(_))));

        let bad = EncoderOptions::default().with_transient_thresholds(1.0, 3.5, 2.0);
        assert!(bad.validate().is_err());
    }
}
