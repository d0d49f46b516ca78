//! Psychoacoustic masking analysis.
//!
//! The MDCT power spectrum is resampled onto a 257-bin PSD through a
//! precomputed index table, normalized so its peak sits at the 68 dB
//! reference level, and scanned for tonal and non-tonal maskers. Maskers
//! below the absolute threshold of hearing are decimated; the survivors are
//! spread across the Bark axis with level-dependent slopes and combined with
//! the threshold in quiet into 25 critical-band masking thresholds.

use crate::core::constants::{BARK_BAND_EDGES, NUM_BARK_BANDS, SAMPLE_RATE};

/// PSD length: FFT size 512 over the 0..22.05 kHz half spectrum.
pub const PSD_SIZE: usize = 257;

/// Reference level the normalized PSD peaks at, in dB.
const TARGET_DB: f64 = 68.0;

const MIN_DB: f64 = -100.0;
const EPS_POWER: f64 = 1e-20;

/// Minimum prominence over the examination neighborhood for a tonal masker.
const TONAL_PROMINENCE_DB: f64 = 7.0;

#[derive(Debug, Clone, Copy)]
struct Masker {
    bin: usize,
    spl: f64,
    tonal: bool,
}

pub struct PsychoacousticModel {
    /// Bark value of each PSD bin.
    psd_bark: [f64; PSD_SIZE],
    /// Threshold in quiet at each PSD bin, dB SPL.
    psd_ath: [f64; PSD_SIZE],
    /// Critical band of each PSD bin.
    band_of_bin: [usize; PSD_SIZE],
    band_center_bark: [f64; NUM_BARK_BANDS],
    band_ath: [f64; NUM_BARK_BANDS],
    /// Wire spectrum position -> natural frequency position (mid and high
    /// bands travel in reversed order).
    natural_index: [usize; 512],
    power: Vec<f64>,
    psd: Vec<f64>,
    examined: Vec<bool>,
    maskers: Vec<Masker>,
}

impl PsychoacousticModel {
    pub fn new() -> Self {
        let bin_freq = |i: usize| (2 * i + 1) as f64 * SAMPLE_RATE as f64 / 4.0 / 512.0;

        let mut psd_bark = [0.0; PSD_SIZE];
        let mut psd_ath = [0.0; PSD_SIZE];
        let mut band_of_bin = [0; PSD_SIZE];
        for i in 0..PSD_SIZE {
            let f = bin_freq(i);
            psd_bark[i] = freq_to_bark(f);
            psd_ath[i] = absolute_threshold(f);
            band_of_bin[i] = freq_to_bark_band(f as f32);
        }

        let mut band_center_bark = [0.0; NUM_BARK_BANDS];
        let mut band_ath = [0.0; NUM_BARK_BANDS];
        for b in 0..NUM_BARK_BANDS {
            let center = 0.5 * (BARK_BAND_EDGES[b] + BARK_BAND_EDGES[b + 1]) as f64;
            band_center_bark[b] = freq_to_bark(center);
            band_ath[b] = absolute_threshold(center);
        }

        let mut natural_index = [0; 512];
        for (w, n) in natural_index.iter_mut().enumerate() {
            *n = match w {
                0..=127 => w,
                128..=255 => 383 - w,
                _ => 767 - w,
            };
        }

        PsychoacousticModel {
            psd_bark,
            psd_ath,
            band_of_bin,
            band_center_bark,
            band_ath,
            natural_index,
            power: vec![0.0; 512],
            psd: vec![0.0; PSD_SIZE],
            examined: vec![false; PSD_SIZE],
            maskers: Vec::with_capacity(64),
        }
    }

    /// Bark position of each critical-band center, for interpolating the
    /// returned thresholds onto other frequency grids.
    pub fn band_center_bark(&self) -> &[f64; NUM_BARK_BANDS] {
        &self.band_center_bark
    }

    /// Compute the 25 critical-band masking thresholds for one frame's wire
    /// spectrum, in the coefficient-power dB domain (directly comparable to
    /// `10*log10(sum c^2)` of spectrum coefficients).
    pub fn analyze(&mut self, spectrum: &[f32]) -> [f64; NUM_BARK_BANDS] {
        debug_assert_eq!(spectrum.len(), 512);

        // Undo the wire ordering so PSD bins line up with frequency.
        for (w, &c) in spectrum.iter().enumerate() {
            self.power[self.natural_index[w]] = (c as f64) * (c as f64);
        }

        let mut max_db = MIN_DB;
        for i in 0..PSD_SIZE {
            let p = if i < 256 {
                self.power[2 * i] + self.power[2 * i + 1]
            } else {
                0.0
            };
            let db = if p > EPS_POWER { 10.0 * p.log10() } else { MIN_DB };
            self.psd[i] = db;
            max_db = max_db.max(db);
        }

        // All-zero input: no maskers, the quiet threshold is the answer.
        if max_db <= MIN_DB {
            return self.band_ath;
        }

        let offset = TARGET_DB - max_db;
        for p in self.psd.iter_mut() {
            *p += offset;
        }

        self.find_tonal_maskers();
        self.find_noise_maskers();
        let ath = &self.psd_ath;
        self.maskers.retain(|m| m.spl >= ath[m.bin]);

        let mut thresholds = [0.0; NUM_BARK_BANDS];
        for b in 0..NUM_BARK_BANDS {
            let z = self.band_center_bark[b];
            let mut sum = 10f64.powf(self.band_ath[b] / 10.0);
            for m in &self.maskers {
                let dz = z - self.psd_bark[m.bin];
                if !(-3.0..8.0).contains(&dz) {
                    continue;
                }
                let av = masking_index(m.tonal, self.psd_bark[m.bin]);
                let vf = spreading(dz, m.spl);
                sum += 10f64.powf((m.spl + av + vf) / 10.0);
            }
            thresholds[b] = 10.0 * sum.log10() - offset;
        }
        thresholds
    }

    /// Local maxima that dominate their examination neighborhood by at least
    /// 7 dB. The neighborhood widens with frequency.
    fn find_tonal_maskers(&mut self) {
        self.maskers.clear();
        self.examined.fill(false);

        for k in 3..250 {
            if self.psd[k] <= self.psd[k - 1] || self.psd[k] < self.psd[k + 1] {
                continue;
            }
            let offsets: &[usize] = match k {
                3..=62 => &[2],
                63..=126 => &[2, 3],
                _ => &[2, 3, 4, 5, 6],
            };
            let prominent = offsets.iter().all(|&d| {
                self.psd[k] - self.psd[k + d] >= TONAL_PROMINENCE_DB
                    && self.psd[k] - self.psd[k - d] >= TONAL_PROMINENCE_DB
            });
            if !prominent {
                continue;
            }

            let spl = 10.0
                * (10f64.powf(self.psd[k - 1] / 10.0)
                    + 10f64.powf(self.psd[k] / 10.0)
                    + 10f64.powf(self.psd[k + 1] / 10.0))
                .log10();
            self.maskers.push(Masker {
                bin: k,
                spl,
                tonal: true,
            });
            self.examined[k - 1] = true;
            self.examined[k] = true;
            self.examined[k + 1] = true;
        }
    }

    /// Remaining power of each critical band collapses into one noise masker
    /// at the band's energy centroid.
    fn find_noise_maskers(&mut self) {
        for band in 0..NUM_BARK_BANDS {
            let mut sum = 0.0;
            let mut centroid = 0.0;
            for i in 0..PSD_SIZE {
                if self.band_of_bin[i] != band || self.examined[i] {
                    continue;
                }
                let p = 10f64.powf(self.psd[i] / 10.0);
                sum += p;
                centroid += i as f64 * p;
            }
            if sum <= EPS_POWER {
                continue;
            }
            let bin = (centroid / sum).round() as usize;
            self.maskers.push(Masker {
                bin: bin.min(PSD_SIZE - 1),
                spl: 10.0 * sum.log10(),
                tonal: false,
            });
        }
    }
}

impl Default for PsychoacousticModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert frequency to Bark scale
/// (Traunmüller's formula)
pub fn freq_to_bark(freq: f64) -> f64 {
    let bark = (26.81 * freq) / (1960.0 + freq) - 0.53;
    bark.clamp(0.0, 24.0)
}

/// Get the critical band index for a frequency
pub fn freq_to_bark_band(freq: f32) -> usize {
    for (i, &edge) in BARK_BAND_EDGES.iter().enumerate().skip(1) {
        if freq < edge {
            return i - 1;
        }
    }
    NUM_BARK_BANDS - 1
}

/// Absolute Threshold of Hearing (ATH) in dB SPL
/// Based on ISO 226 / Terhardt formula
pub fn absolute_threshold(freq: f64) -> f64 {
    if !(20.0..=20000.0).contains(&freq) {
        return 96.0; // Essentially inaudible
    }

    let f_khz = freq / 1000.0;
    let term1 = 3.64 * f_khz.powf(-0.8);
    let term2 = 6.5 * (-0.6 * (f_khz - 3.3).powi(2)).exp();
    let term3 = 0.001 * f_khz.powi(4);

    (term1 - term2 + term3).clamp(-10.0, 96.0)
}

/// Masking index of a masker at Bark position `z`: tonal maskers sit further
/// below their own level than noise maskers.
fn masking_index(tonal: bool, z: f64) -> f64 {
    if tonal {
        -1.525 - 0.275 * z - 4.5
    } else {
        -1.525 - 0.175 * z - 0.5
    }
}

/// Piecewise-linear spreading of a masker of level `spl` at Bark distance
/// `dz` (masked minus masker), valid for -3 <= dz < 8.
fn spreading(dz: f64, spl: f64) -> f64 {
    if dz < -1.0 {
        17.0 * (dz + 1.0) - (0.4 * spl + 6.0)
    } else if dz < 0.0 {
        (0.4 * spl + 6.0) * dz
    } else if dz < 1.0 {
        -17.0 * dz
    } else {
        -(dz - 1.0) * (17.0 - 0.15 * spl) - 17.0
    }
}
