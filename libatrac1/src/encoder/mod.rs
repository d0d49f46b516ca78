//! Per-channel encoder: 512 PCM samples in, one logical encoded frame out.

pub mod bitalloc;
pub mod psymodel;
pub mod transient;

use crate::core::constants::{
    BAND_SAMPLES, BFU_SIZES, FRAME_SAMPLES, MAX_BFUS,
};
use crate::core::types::{EncodedFrame, EncoderOptions};
use crate::error::AtracResult;
use crate::quant::Quantizer;
use crate::transform::{BandMdct, FftEngine, QmfAnalysisTree};

use bitalloc::BitAllocator;
use psymodel::PsychoacousticModel;
use transient::TransientDetector;

const ENERGY_EPS: f64 = 1e-20;

/// Stateful single-channel encoder. Frames must be fed in stream order; the
/// QMF delay lines, MDCT tails and transient history tie each frame to its
/// predecessor. All buffers are allocated at construction.
pub struct Encoder {
    options: EncoderOptions,
    qmf: QmfAnalysisTree,
    transient: TransientDetector,
    mdct: BandMdct,
    psy: PsychoacousticModel,
    allocator: BitAllocator,
    quantizer: Quantizer,
    low: Vec<f32>,
    mid: Vec<f32>,
    high: Vec<f32>,
    spectrum: Vec<f32>,
}

impl Encoder {
    pub fn new(options: EncoderOptions) -> AtracResult<Self> {
        options.validate()?;
        let mut fft = FftEngine::new();
        Ok(Encoder {
            options,
            qmf: QmfAnalysisTree::new(),
            transient: TransientDetector::new(&options),
            mdct: BandMdct::new(&mut fft),
            psy: PsychoacousticModel::new(),
            allocator: BitAllocator::new(),
            quantizer: Quantizer::new(),
            low: vec![0.0; BAND_SAMPLES[0]],
            mid: vec![0.0; BAND_SAMPLES[1]],
            high: vec![0.0; BAND_SAMPLES[2]],
            spectrum: vec![0.0; FRAME_SAMPLES],
        })
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Encode one frame. The returned frame always respects the bit budget
    /// and uses one of the selectable BFU amounts.
    pub fn encode_frame(&mut self, pcm: &[f32; FRAME_SAMPLES]) -> EncodedFrame {
        self.qmf
            .analyze(pcm, &mut self.low, &mut self.mid, &mut self.high);
        let modes = self.transient.detect(&self.low, &self.mid, &self.high);
        self.mdct
            .process(&self.low, &self.mid, &self.high, modes, &mut self.spectrum);

        let thresholds = self.psy.analyze(&self.spectrum);

        let mut scale_factors = [0u8; MAX_BFUS];
        let mut energies = [0.0f64; MAX_BFUS];
        for i in 0..MAX_BFUS {
            let start = modes.bfu_start(i);
            let group = &self.spectrum[start..start + BFU_SIZES[i]];
            scale_factors[i] = self.quantizer.find_scale_factor(group);
            let power: f64 = group.iter().map(|&c| (c as f64) * (c as f64)).sum();
            energies[i] = 10.0 * (power + ENERGY_EPS).log10();
        }

        let allocation = self.allocator.allocate(
            &energies,
            &scale_factors,
            &thresholds,
            self.psy.band_center_bark(),
        );

        let n_bfu = allocation.n_bfu;
        let mut coefficients = Vec::with_capacity(n_bfu);
        for i in 0..n_bfu {
            let start = modes.bfu_start(i);
            let group = &self.spectrum[start..start + BFU_SIZES[i]];
            let mut quantized = vec![0i32; BFU_SIZES[i]];
            self.quantizer.quantize(
                group,
                scale_factors[i],
                allocation.word_lengths[i],
                &mut quantized,
            );
            coefficients.push(quantized);
        }

        EncodedFrame {
            block_modes: modes,
            word_lengths: allocation.word_lengths,
            scale_factors: scale_factors[..n_bfu].to_vec(),
            coefficients,
        }
    }

    /// Clear all streaming state (for seeking or a new stream).
    pub fn reset(&mut self) {
        self.qmf.reset();
        self.transient.reset();
        self.mdct.reset();
    }
}
