// The DCT-IV reduction to a quarter-size complex FFT follows the classic
// e^(-i*pi*(k + 1/8)/M) twiddle construction; the fold/unfold index algebra
// matches the flat-top windows this format uses (32-sample sine ramps with
// zero padding) rather than a full-length window.

use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::Fft;

use crate::core::constants::MDCT_OVERLAP;
use crate::core::types::{BlockMode, BlockModes};
use crate::transform::fft::FftEngine;

/// Sine window covering one 32-sample block seam: `w[i] = sin((i+0.5)*pi/64)`.
///
/// `w[i]^2 + w[31-i]^2 = 1`, which is what makes the seam overlap-add below
/// reconstruct exactly.
pub fn sine_window() -> [f64; MDCT_OVERLAP] {
    let mut w = [0.0; MDCT_OVERLAP];
    for (i, v) in w.iter_mut().enumerate() {
        *v = ((i as f64 + 0.5) * PI / 64.0).sin();
    }
    w
}

/// Reconstruct one 32-sample seam from the previous block's trailing seam
/// region and the current block's leading seam region.
///
/// Each seam region of an inverse transform output is a self-aliased
/// combination of the 32 boundary samples; weighting the trailing region by
/// the reversed window and the leading region by the forward window cancels
/// the aliasing term.
pub fn overlap_add(prev_trail: &[f64], curr_lead: &[f64], window: &[f64], out: &mut [f64]) {
    debug_assert_eq!(prev_trail.len(), MDCT_OVERLAP);
    debug_assert_eq!(curr_lead.len(), MDCT_OVERLAP);
    for i in 0..MDCT_OVERLAP {
        out[i] = prev_trail[i] * window[MDCT_OVERLAP - 1 - i] + curr_lead[i] * window[i];
    }
}

/// DCT-IV of length M computed through a size-M/2 complex FFT.
struct Dct4 {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    /// `e^(-i*pi*(k + 1/8)/M)`; serves as both pre- and post-twiddle.
    twiddle: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl Dct4 {
    fn new(engine: &mut FftEngine, size: usize) -> Self {
        assert!(size.is_power_of_two() && size >= 4);
        let half = size / 2;
        let twiddle: Vec<Complex<f64>> = (0..half)
            .map(|k| {
                let theta = PI * (k as f64 + 0.125) / size as f64;
                Complex::new(theta.cos(), -theta.sin())
            })
            .collect();

        Dct4 {
            size,
            fft: engine.plan(half),
            twiddle,
            scratch: vec![Complex::new(0.0, 0.0); half],
        }
    }

    /// `out[k] = sum_j in[j] * cos(pi/M * (j + 1/2) * (k + 1/2))`, unnormalized.
    fn process(&mut self, input: &[f64], output: &mut [f64]) {
        let m = self.size;
        let half = m / 2;
        debug_assert_eq!(input.len(), m);
        debug_assert_eq!(output.len(), m);

        for p in 0..half {
            let v = Complex::new(input[2 * p], input[m - 1 - 2 * p]);
            self.scratch[p] = v * self.twiddle[p];
        }

        self.fft.process(&mut self.scratch);

        for r in 0..half {
            let a = self.scratch[r] * self.twiddle[r];
            output[2 * r] = a.re;
            output[m - 1 - 2 * r] = -a.im;
        }
    }
}

/// Forward/inverse MDCT for one transform size N = 2M.
///
/// `forward` consumes N samples and produces M coefficients scaled by 2/M so
/// that full-scale input stays within the quantizer's scale-factor range;
/// `inverse` undoes the scale and returns the N-sample time-aliased output
/// ready for seam reconstruction.
pub struct Mdct {
    /// Coefficients per block (M); the transform consumes 2M samples.
    m: usize,
    dct: Dct4,
    fold: Vec<f64>,
    unfold: Vec<f64>,
}

impl Mdct {
    pub fn new(engine: &mut FftEngine, num_coeffs: usize) -> Self {
        Mdct {
            m: num_coeffs,
            dct: Dct4::new(engine, num_coeffs),
            fold: vec![0.0; num_coeffs],
            unfold: vec![0.0; num_coeffs],
        }
    }

    pub fn num_coeffs(&self) -> usize {
        self.m
    }

    /// N = 2M samples in, M coefficients out.
    pub fn forward(&mut self, input: &[f64], output: &mut [f64]) {
        let m = self.m;
        debug_assert_eq!(input.len(), 2 * m);
        debug_assert_eq!(output.len(), m);

        // Fold the 2M input samples into an M-point DCT-IV input.
        let h = m / 2;
        for j in 0..h {
            self.fold[j] = -input[3 * h - 1 - j] - input[3 * h + j];
        }
        for j in 0..h {
            self.fold[h + j] = input[j] - input[m - 1 - j];
        }

        self.dct.process(&self.fold, output);

        let scale = 2.0 / m as f64;
        for v in output.iter_mut() {
            *v *= scale;
        }
    }

    /// M coefficients in, N = 2M time-aliased samples out.
    pub fn inverse(&mut self, spec: &[f64], output: &mut [f64]) {
        let m = self.m;
        debug_assert_eq!(spec.len(), m);
        debug_assert_eq!(output.len(), 2 * m);

        self.dct.process(spec, &mut self.unfold);

        // DCT-IV is involutive up to M/2, which exactly cancels the forward
        // 2/M scale; unfold back to 2M samples.
        let h = m / 2;
        for n in 0..h {
            output[n] = self.unfold[h + n];
        }
        for n in h..3 * h {
            output[n] = -self.unfold[3 * h - 1 - n];
        }
        for n in 3 * h..2 * m {
            output[n] = -self.unfold[n - 3 * h];
        }
    }
}

/// Active-region offset of a block with M coefficients within its 2M-sample
/// transform window. Placing the `32 + body + 32` region here makes both seam
/// regions alias onto themselves and keeps the body clear of aliasing.
fn window_start(m: usize) -> usize {
    (m - MDCT_OVERLAP) / 2
}

/// Compensation for the QMF analysis gain (2x per stage: 4x on the low and
/// mid branches, 2x on high), so that full-scale PCM lands inside the
/// scale-factor table's range. The inverse stage divides it back out.
const BAND_GAIN: [f64; 3] = [0.25, 0.25, 0.5];

/// Forward MDCT stage: three band signals in, 512-coefficient spectrum out.
///
/// Keeps a 32-sample windowed tail per band across frames, so consecutive
/// blocks (and consecutive frames) share their seams regardless of block
/// mode transitions.
pub struct BandMdct {
    mdct32: Mdct,
    mdct128: Mdct,
    mdct256: Mdct,
    tails: [[f64; MDCT_OVERLAP]; 3],
    window: [f64; MDCT_OVERLAP],
    input: Vec<f64>,
    coeffs: Vec<f64>,
}

impl BandMdct {
    pub fn new(engine: &mut FftEngine) -> Self {
        BandMdct {
            mdct32: Mdct::new(engine, 32),
            mdct128: Mdct::new(engine, 128),
            mdct256: Mdct::new(engine, 256),
            tails: [[0.0; MDCT_OVERLAP]; 3],
            window: sine_window(),
            input: vec![0.0; 512],
            coeffs: vec![0.0; 256],
        }
    }

    /// Transform one frame. Band lengths are 128/128/256; the spectrum is
    /// written in wire layout (mid and high bands spectrally reversed).
    pub fn process(
        &mut self,
        low: &[f32],
        mid: &[f32],
        high: &[f32],
        modes: BlockModes,
        spectrum: &mut [f32],
    ) {
        debug_assert_eq!(spectrum.len(), 512);
        self.band(0, low, modes.mode(0), 0, spectrum);
        self.band(1, mid, modes.mode(1), 128, spectrum);
        self.band(2, high, modes.mode(2), 256, spectrum);
    }

    fn band(&mut self, band: usize, samples: &[f32], mode: BlockMode, offset: usize, out: &mut [f32]) {
        let len = samples.len();
        let block_len = match mode {
            BlockMode::Long => len,
            BlockMode::Short => 32,
        };
        let count = len / block_len;

        for k in 0..count {
            let blk = &samples[k * block_len..(k + 1) * block_len];
            let m = block_len;
            let n = 2 * m;
            let p = window_start(m);

            self.input[..n].fill(0.0);
            self.input[p..p + MDCT_OVERLAP].copy_from_slice(&self.tails[band]);
            for (i, &s) in blk[..m - MDCT_OVERLAP].iter().enumerate() {
                self.input[p + MDCT_OVERLAP + i] = s as f64;
            }
            for i in 0..MDCT_OVERLAP {
                let s = blk[m - MDCT_OVERLAP + i] as f64;
                self.input[p + m + i] = self.window[MDCT_OVERLAP - 1 - i] * s;
                self.tails[band][i] = self.window[i] * s;
            }

            let mdct = match m {
                32 => &mut self.mdct32,
                128 => &mut self.mdct128,
                _ => &mut self.mdct256,
            };
            mdct.forward(&self.input[..n], &mut self.coeffs[..m]);

            let gain = BAND_GAIN[band];
            let dst = &mut out[offset + k * m..offset + (k + 1) * m];
            for (i, v) in dst.iter_mut().enumerate() {
                *v = (self.coeffs[i] * gain) as f32;
            }
            // Mid and high band spectra go on the wire in reversed order.
            if band > 0 {
                dst.reverse();
            }
        }
    }

    pub fn reset(&mut self) {
        self.tails = [[0.0; MDCT_OVERLAP]; 3];
    }
}

/// Inverse MDCT stage: 512-coefficient spectrum in, three band signals out.
///
/// Band output is the input delayed by 32 band samples; the trailing seam of
/// the last block is retained for the next frame.
pub struct BandImdct {
    mdct32: Mdct,
    mdct128: Mdct,
    mdct256: Mdct,
    trails: [[f64; MDCT_OVERLAP]; 3],
    window: [f64; MDCT_OVERLAP],
    spec: Vec<f64>,
    time: Vec<f64>,
    seam: Vec<f64>,
}

impl BandImdct {
    pub fn new(engine: &mut FftEngine) -> Self {
        BandImdct {
            mdct32: Mdct::new(engine, 32),
            mdct128: Mdct::new(engine, 128),
            mdct256: Mdct::new(engine, 256),
            trails: [[0.0; MDCT_OVERLAP]; 3],
            window: sine_window(),
            spec: vec![0.0; 256],
            time: vec![0.0; 512],
            seam: vec![0.0; MDCT_OVERLAP],
        }
    }

    pub fn process(
        &mut self,
        spectrum: &[f32],
        modes: BlockModes,
        low: &mut [f32],
        mid: &mut [f32],
        high: &mut [f32],
    ) {
        debug_assert_eq!(spectrum.len(), 512);
        self.band(0, &spectrum[..128], modes.mode(0), low);
        self.band(1, &spectrum[128..256], modes.mode(1), mid);
        self.band(2, &spectrum[256..512], modes.mode(2), high);
    }

    fn band(&mut self, band: usize, coeffs: &[f32], mode: BlockMode, out: &mut [f32]) {
        let len = coeffs.len();
        let block_len = match mode {
            BlockMode::Long => len,
            BlockMode::Short => 32,
        };
        let count = len / block_len;

        for k in 0..count {
            let m = block_len;
            let p = window_start(m);
            let blk = &coeffs[k * m..(k + 1) * m];

            // Undo the wire-order reversal of mid/high blocks and the
            // forward stage's band gain.
            for i in 0..m {
                let src = if band > 0 { m - 1 - i } else { i };
                self.spec[i] = blk[src] as f64 / BAND_GAIN[band];
            }

            let mdct = match m {
                32 => &mut self.mdct32,
                128 => &mut self.mdct128,
                _ => &mut self.mdct256,
            };
            mdct.inverse(&self.spec[..m], &mut self.time[..2 * m]);

            overlap_add(
                &self.trails[band],
                &self.time[p..p + MDCT_OVERLAP],
                &self.window,
                &mut self.seam,
            );

            let dst = &mut out[k * m..(k + 1) * m];
            for i in 0..MDCT_OVERLAP {
                dst[i] = self.seam[i] as f32;
            }
            for i in MDCT_OVERLAP..m {
                dst[i] = self.time[p + i] as f32;
            }
            self.trails[band].copy_from_slice(&self.time[p + m..p + m + MDCT_OVERLAP]);
        }
    }

    pub fn reset(&mut self) {
        self.trails = [[0.0; MDCT_OVERLAP]; 3];
    }
}
