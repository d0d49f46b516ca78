//! Per-band transient detection driving the long/short block-mode decision.
//!
//! Each band's magnitude spectrum is compared against the previous frame's
//! through four change measures; their average is scored against the band's
//! threshold. With no previous spectrum the band is never transient.

use rustfft::num_complex::Complex;

use crate::core::constants::{BAND_SAMPLES, NUM_BANDS};
use crate::core::types::{BlockMode, BlockModes, EncoderOptions};
use crate::transform::FftEngine;

const EPS: f64 = 1e-10;

pub struct TransientDetector {
    thresholds: [f32; NUM_BANDS],
    fft: FftEngine,
    prev_spectrum: [Vec<f64>; NUM_BANDS],
    have_prev: [bool; NUM_BANDS],
    scratch: Vec<Complex<f64>>,
    mags: Vec<f64>,
}

impl TransientDetector {
    pub fn new(options: &EncoderOptions) -> Self {
        let mut fft = FftEngine::new();
        // Warm the plans for both band FFT sizes.
        fft.plan(BAND_SAMPLES[0]);
        fft.plan(BAND_SAMPLES[2]);

        TransientDetector {
            thresholds: [
                options.transient_threshold(0),
                options.transient_threshold(1),
                options.transient_threshold(2),
            ],
            fft,
            prev_spectrum: [
                vec![0.0; BAND_SAMPLES[0] / 2],
                vec![0.0; BAND_SAMPLES[1] / 2],
                vec![0.0; BAND_SAMPLES[2] / 2],
            ],
            have_prev: [false; NUM_BANDS],
            scratch: vec![Complex::new(0.0, 0.0); BAND_SAMPLES[2]],
            mags: vec![0.0; BAND_SAMPLES[2] / 2],
        }
    }

    /// Decide the block mode of each band for the current frame.
    pub fn detect(&mut self, low: &[f32], mid: &[f32], high: &[f32]) -> BlockModes {
        let low_mode = self.band(0, low);
        let mid_mode = self.band(1, mid);
        let high_mode = self.band(2, high);
        BlockModes {
            low: low_mode,
            mid: mid_mode,
            high: high_mode,
        }
    }

    fn band(&mut self, band: usize, samples: &[f32]) -> BlockMode {
        let n = samples.len();
        let bins = n / 2;

        for (z, &s) in self.scratch[..n].iter_mut().zip(samples.iter()) {
            *z = Complex::new(s as f64, 0.0);
        }
        self.fft.forward(&mut self.scratch[..n]);
        for i in 0..bins {
            self.mags[i] = self.scratch[i].norm();
        }

        let transient = if self.have_prev[band] {
            let score = composite_score(&self.mags[..bins], &self.prev_spectrum[band]);
            score > self.thresholds[band] as f64
        } else {
            false
        };

        self.prev_spectrum[band].copy_from_slice(&self.mags[..bins]);
        self.have_prev[band] = true;

        if transient {
            BlockMode::Short
        } else {
            BlockMode::Long
        }
    }

    pub fn reset(&mut self) {
        self.have_prev = [false; NUM_BANDS];
        for prev in &mut self.prev_spectrum {
            prev.fill(0.0);
        }
    }
}

/// Average of the four change measures between consecutive magnitude spectra.
fn composite_score(curr: &[f64], prev: &[f64]) -> f64 {
    let flux = spectral_flux(curr, prev);
    let flatness = (flatness(curr) - flatness(prev)).abs().sqrt();
    let hf = hf_ratio_change(curr, prev);
    let energy = energy_change(curr, prev);
    (flux + flatness + hf + energy) / 4.0
}

/// Positive magnitude growth, normalized by the current spectral RMS.
fn spectral_flux(curr: &[f64], prev: &[f64]) -> f64 {
    let rise: f64 = curr
        .iter()
        .zip(prev.iter())
        .map(|(&c, &p)| (c - p).max(0.0))
        .sum();
    let energy: f64 = curr.iter().map(|&c| c * c).sum();
    rise / (energy.sqrt() + EPS)
}

/// Geometric over arithmetic mean of the magnitudes above the noise floor.
fn flatness(mags: &[f64]) -> f64 {
    let mut log_sum = 0.0;
    let mut sum = 0.0;
    let mut count = 0usize;
    for &m in mags {
        if m > EPS {
            log_sum += m.ln();
            sum += m;
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    let geometric = (log_sum / count as f64).exp();
    let arithmetic = sum / count as f64;
    geometric / (arithmetic + EPS)
}

/// Log-compressed change of the upper-half energy share.
fn hf_ratio_change(curr: &[f64], prev: &[f64]) -> f64 {
    let ratio = |mags: &[f64]| {
        let total: f64 = mags.iter().map(|&m| m * m).sum();
        let upper: f64 = mags[mags.len() / 2..].iter().map(|&m| m * m).sum();
        upper / (total + EPS)
    };
    let delta = (ratio(curr) - ratio(prev)).abs();
    (1.0 + 9.0 * delta).ln() / 10f64.ln()
}

/// Energy rise in dB, clamped to 30 dB and normalized to [0, 1].
fn energy_change(curr: &[f64], prev: &[f64]) -> f64 {
    let ec: f64 = curr.iter().map(|&m| m * m).sum();
    let ep: f64 = prev.iter().map(|&m| m * m).sum();
    let rise_db = (10.0 * ((ec + EPS) / (ep + EPS)).log10()).max(0.0);
    rise_db.min(30.0) / 30.0
}
