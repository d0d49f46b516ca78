//! 48-tap quadrature mirror filterbank and the two-stage band-split trees.
//!
//! The prototype is a symmetric lowpass half-filter; analysis evaluates its
//! even and odd polyphases against a delayed work buffer and forms the band
//! pair as sum and difference. Synthesis interleaves the half-rate bands back
//! into the work buffer and runs the same polyphase evaluation. Each
//! direction carries a 46-sample delay line, giving a 46-sample round trip
//! per stage.

use crate::core::constants::{BAND_SAMPLES, FRAME_SAMPLES, HIGH_BAND_DELAY, QMF_DELAY, QMF_TAP_HALF};

const TAPS: usize = 48;
const HALF_TAPS: usize = TAPS / 2;

/// Full 48-tap window: symmetric expansion of the half-filter, scaled by 2 to
/// compensate the 0.5 in the synthesis interleave.
fn qmf_window() -> [f64; TAPS] {
    let mut w = [0.0; TAPS];
    for (i, &tap) in QMF_TAP_HALF.iter().enumerate() {
        w[i] = tap * 2.0;
        w[TAPS - 1 - i] = tap * 2.0;
    }
    w
}

/// One-stage analysis split: N samples in, two N/2-sample bands out.
pub struct QmfAnalysis {
    window: [f64; TAPS],
    work: Vec<f64>,
    input_len: usize,
}

impl QmfAnalysis {
    pub fn new(input_len: usize) -> Self {
        assert!(input_len % 2 == 0);
        QmfAnalysis {
            window: qmf_window(),
            work: vec![0.0; QMF_DELAY + input_len],
            input_len,
        }
    }

    pub fn analyze(&mut self, input: &[f32], low: &mut [f32], high: &mut [f32]) {
        let n = self.input_len;
        debug_assert_eq!(input.len(), n);
        debug_assert_eq!(low.len(), n / 2);
        debug_assert_eq!(high.len(), n / 2);

        for (i, &s) in input.iter().enumerate() {
            self.work[QMF_DELAY + i] = s as f64;
        }

        for i in 0..n / 2 {
            let mut even = 0.0;
            let mut odd = 0.0;
            for j in 0..HALF_TAPS {
                even += self.window[2 * j] * self.work[2 * i + 47 - 2 * j];
                odd += self.window[2 * j + 1] * self.work[2 * i + 46 - 2 * j];
            }
            low[i] = (even + odd) as f32;
            high[i] = (even - odd) as f32;
        }

        self.work.copy_within(n..n + QMF_DELAY, 0);
    }

    pub fn reset(&mut self) {
        self.work.fill(0.0);
    }
}

/// One-stage synthesis merge: two N/2-sample bands in, N samples out.
pub struct QmfSynthesis {
    window: [f64; TAPS],
    work: Vec<f64>,
    output_len: usize,
}

impl QmfSynthesis {
    pub fn new(output_len: usize) -> Self {
        assert!(output_len % 2 == 0);
        QmfSynthesis {
            window: qmf_window(),
            work: vec![0.0; QMF_DELAY + output_len],
            output_len,
        }
    }

    pub fn synthesize(&mut self, low: &[f32], high: &[f32], output: &mut [f32]) {
        let n = self.output_len;
        debug_assert_eq!(low.len(), n / 2);
        debug_assert_eq!(high.len(), n / 2);
        debug_assert_eq!(output.len(), n);

        for i in 0..n / 2 {
            let l = low[i] as f64;
            let h = high[i] as f64;
            self.work[QMF_DELAY + 2 * i] = 0.5 * (l + h);
            self.work[QMF_DELAY + 2 * i + 1] = 0.5 * (l - h);
        }

        for i in 0..n / 2 {
            let mut even = 0.0;
            let mut odd = 0.0;
            for j in 0..HALF_TAPS {
                even += self.window[2 * j] * self.work[2 * i + 47 - 2 * j];
                odd += self.window[2 * j + 1] * self.work[2 * i + 46 - 2 * j];
            }
            output[2 * i] = even as f32;
            output[2 * i + 1] = odd as f32;
        }

        self.work.copy_within(n..n + QMF_DELAY, 0);
    }

    pub fn reset(&mut self) {
        self.work.fill(0.0);
    }
}

/// Fixed-length delay line equalizing the high branch against the extra
/// stage the low branch passes through.
struct BranchDelay {
    buf: Vec<f32>,
}

impl BranchDelay {
    fn new() -> Self {
        BranchDelay {
            buf: vec![0.0; HIGH_BAND_DELAY],
        }
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let n = input.len();
        debug_assert_eq!(output.len(), n);
        output[..HIGH_BAND_DELAY].copy_from_slice(&self.buf);
        output[HIGH_BAND_DELAY..].copy_from_slice(&input[..n - HIGH_BAND_DELAY]);
        self.buf.copy_from_slice(&input[n - HIGH_BAND_DELAY..]);
    }

    fn reset(&mut self) {
        self.buf.fill(0.0);
    }
}

/// Encoder-side band split: 512 samples -> low(128) + mid(128) + high(256).
pub struct QmfAnalysisTree {
    stage1: QmfAnalysis,
    stage2: QmfAnalysis,
    high_delay: BranchDelay,
    low1: Vec<f32>,
    high1: Vec<f32>,
}

impl QmfAnalysisTree {
    pub fn new() -> Self {
        QmfAnalysisTree {
            stage1: QmfAnalysis::new(FRAME_SAMPLES),
            stage2: QmfAnalysis::new(FRAME_SAMPLES / 2),
            high_delay: BranchDelay::new(),
            low1: vec![0.0; FRAME_SAMPLES / 2],
            high1: vec![0.0; FRAME_SAMPLES / 2],
        }
    }

    pub fn analyze(&mut self, pcm: &[f32], low: &mut [f32], mid: &mut [f32], high: &mut [f32]) {
        debug_assert_eq!(pcm.len(), FRAME_SAMPLES);
        debug_assert_eq!(low.len(), BAND_SAMPLES[0]);
        debug_assert_eq!(mid.len(), BAND_SAMPLES[1]);
        debug_assert_eq!(high.len(), BAND_SAMPLES[2]);

        self.stage1.analyze(pcm, &mut self.low1, &mut self.high1);
        self.stage2.analyze(&self.low1, low, mid);
        self.high_delay.process(&self.high1, high);
    }

    pub fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
        self.high_delay.reset();
    }
}

impl Default for QmfAnalysisTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoder-side band merge, mirroring [`QmfAnalysisTree`] including the
/// high-branch equalization delay.
pub struct QmfSynthesisTree {
    stage2: QmfSynthesis,
    stage1: QmfSynthesis,
    high_delay: BranchDelay,
    low1: Vec<f32>,
    high1: Vec<f32>,
}

impl QmfSynthesisTree {
    pub fn new() -> Self {
        QmfSynthesisTree {
            stage2: QmfSynthesis::new(FRAME_SAMPLES / 2),
            stage1: QmfSynthesis::new(FRAME_SAMPLES),
            high_delay: BranchDelay::new(),
            low1: vec![0.0; FRAME_SAMPLES / 2],
            high1: vec![0.0; FRAME_SAMPLES / 2],
        }
    }

    pub fn synthesize(&mut self, low: &[f32], mid: &[f32], high: &[f32], pcm: &mut [f32]) {
        debug_assert_eq!(pcm.len(), FRAME_SAMPLES);

        self.stage2.synthesize(low, mid, &mut self.low1);
        self.high_delay.process(high, &mut self.high1);
        self.stage1.synthesize(&self.low1, &self.high1, pcm);
    }

    pub fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
        self.high_delay.reset();
    }
}

impl Default for QmfSynthesisTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::SAMPLE_RATE;
    use std::f32::consts::PI;

    #[test]
    fn single_stage_round_trip_is_delayed_by_46() {
        let mut analysis = QmfAnalysis::new(256);
        let mut synthesis = QmfSynthesis::new(256);

        let num_frames = 8;
        let tone: Vec<f32> = (0..256 * num_frames)
            .map(|i| (2.0 * PI * 1000.0 * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();

        let mut out = Vec::new();
        let mut low = vec![0.0; 128];
        let mut high = vec![0.0; 128];
        let mut frame_out = vec![0.0; 256];
        for frame in tone.chunks(256) {
            analysis.analyze(frame, &mut low, &mut high);
            synthesis.synthesize(&low, &high, &mut frame_out);
            out.extend_from_slice(&frame_out);
        }

        // Skip the transient head, compare against the input shifted by the
        // stage delay.
        let start = 512;
        let end = tone.len() - QMF_DELAY;
        let mut err_energy = 0.0f64;
        let mut sig_energy = 0.0f64;
        for i in start..end {
            let expect = tone[i] as f64;
            let got = out[i + QMF_DELAY] as f64;
            err_energy += (expect - got) * (expect - got);
            sig_energy += expect * expect;
        }
        assert!(
            err_energy < 1e-6 * sig_energy,
            "residual energy ratio {}",
            err_energy / sig_energy
        );
    }

    #[test]
    fn branch_delay_shifts_by_39() {
        let mut delay = BranchDelay::new();
        let a: Vec<f32> = (0..256).map(|i| i as f32).collect();
        let b: Vec<f32> = (256..512).map(|i| i as f32).collect();
        let mut out_a = vec![0.0; 256];
        let mut out_b = vec![0.0; 256];
        delay.process(&a, &mut out_a);
        delay.process(&b, &mut out_b);

        assert!(out_a[..HIGH_BAND_DELAY].iter().all(|&x| x == 0.0));
        assert_eq!(out_a[HIGH_BAND_DELAY], 0.0 + a[0]);
        assert_eq!(out_b[0], a[256 - HIGH_BAND_DELAY]);
        assert_eq!(out_b[HIGH_BAND_DELAY], b[0]);
    }
}
