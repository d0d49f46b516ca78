//! Per-channel decoder: one logical encoded frame in, 512 PCM samples out.

use crate::core::constants::{BAND_SAMPLES, BFU_SIZES, FRAME_SAMPLES, MAX_BFUS};
use crate::core::types::EncodedFrame;
use crate::quant::Quantizer;
use crate::transform::{BandImdct, FftEngine, QmfSynthesisTree};

/// Stateful single-channel decoder, the mirror of the encoder pipeline.
/// Tolerates frames with any BFU count (including zero) and muted BFUs.
pub struct Decoder {
    imdct: BandImdct,
    qmf: QmfSynthesisTree,
    quantizer: Quantizer,
    spectrum: Vec<f32>,
    low: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
}

impl Decoder {
    pub fn new() -> Self {
        let mut fft = FftEngine::new();
        Decoder {
            imdct: BandImdct::new(&mut fft),
            qmf: QmfSynthesisTree::new(),
            quantizer: Quantizer::new(),
            spectrum: vec![0.0; FRAME_SAMPLES],
            low: vec![0.0; BAND_SAMPLES[0]],
            mid: vec![0.0; BAND_SAMPLES[1]],
            high: vec![0.0; BAND_SAMPLES[2]],
        }
    }

    /// Decode one frame. Must be called in stream order: the IMDCT seams and
    /// QMF delay lines continue the previous frame.
    pub fn decode_frame(&mut self, frame: &EncodedFrame) -> [f32; FRAME_SAMPLES] {
        self.spectrum.fill(0.0);

        let n_bfu = frame.n_bfu().min(MAX_BFUS);
        for i in 0..n_bfu {
            let group = match frame.coefficients.get(i) {
                Some(g) if g.len() == BFU_SIZES[i] => g,
                _ => continue,
            };
            let Some(&sf) = frame.scale_factors.get(i) else {
                continue;
            };
            let start = frame.block_modes.bfu_start(i);
            self.quantizer.dequantize(
                group,
                sf,
                frame.word_lengths[i],
                &mut self.spectrum[start..start + BFU_SIZES[i]],
            );
        }

        self.imdct.process(
            &self.spectrum,
            frame.block_modes,
            &mut self.low,
            &mut self.mid,
            &mut self.high,
        );

        let mut pcm = [0.0f32; FRAME_SAMPLES];
        self.qmf
            .synthesize(&self.low, &self.mid, &self.high, &mut pcm);
        pcm
    }

    /// Clear all streaming state (for seeking or a new stream).
    pub fn reset(&mut self) {
        self.imdct.reset();
        self.qmf.reset();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
