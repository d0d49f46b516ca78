//! Rate-distortion bit allocation over the block floating units.
//!
//! Each BFU's signal-to-mask ratio seeds a max-heap priority; the allocator
//! repeatedly upgrades the word length of the neediest BFU while the upgrade
//! still fits the frame's remaining bit budget, decaying the priority by the
//! ~6 dB the extra bits buy. The active BFU count is chosen first with a
//! diminishing-returns rule over the eight selectable amounts.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::constants::{
    BFU_SIZES, BFU_START_LONG, BITS_PER_BFU_METADATA, FRAME_BITS, FRAME_OVERHEAD_BITS, MAX_BFUS,
    NUM_BARK_BANDS, SAMPLE_RATE, WORD_LENGTH_BITS,
};
use crate::encoder::psymodel::freq_to_bark;

/// Quantizer SNR gain per extra bit of word length, in dB.
const DB_PER_BIT: f64 = 6.0206;

/// Result of one frame's allocation.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub n_bfu: usize,
    /// Word-length index per BFU; entries past `n_bfu` are zero.
    pub word_lengths: Vec<u8>,
}

#[derive(Debug)]
struct Candidate {
    priority: f64,
    bfu: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then(other.bfu.cmp(&self.bfu))
    }
}

pub struct BitAllocator {
    /// Bark position of each BFU's center frequency (long-block layout).
    bfu_bark: [f64; MAX_BFUS],
}

impl BitAllocator {
    pub fn new() -> Self {
        let mut bfu_bark = [0.0; MAX_BFUS];
        for (i, bark) in bfu_bark.iter_mut().enumerate() {
            let wire_center = BFU_START_LONG[i] + BFU_SIZES[i] / 2;
            let natural = match wire_center {
                0..=127 => wire_center,
                128..=255 => 383 - wire_center,
                _ => 767 - wire_center,
            };
            let freq = (natural as f64 + 0.5) * SAMPLE_RATE as f64 / 2.0 / 512.0;
            *bark = freq_to_bark(freq);
        }
        BitAllocator { bfu_bark }
    }

    /// Assign word lengths given per-BFU energies (dB), scale-factor indices
    /// (0 marks a silent BFU) and the critical-band masking thresholds with
    /// their Bark-axis centers.
    pub fn allocate(
        &self,
        energies_db: &[f64; MAX_BFUS],
        sf_indices: &[u8; MAX_BFUS],
        thresholds: &[f64; NUM_BARK_BANDS],
        centers: &[f64; NUM_BARK_BANDS],
    ) -> Allocation {
        let mut smr = [f64::NEG_INFINITY; MAX_BFUS];
        for i in 0..MAX_BFUS {
            if sf_indices[i] != 0 {
                smr[i] = energies_db[i] - interpolate(self.bfu_bark[i], thresholds, centers);
            }
        }

        let n_bfu = select_bfu_amount(&smr);
        let budget = FRAME_BITS - FRAME_OVERHEAD_BITS - n_bfu * BITS_PER_BFU_METADATA;

        let mut word_lengths = vec![0u8; MAX_BFUS];
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(n_bfu);
        for (i, &s) in smr.iter().enumerate().take(n_bfu) {
            // NaN priorities would poison the heap ordering; silent BFUs
            // would soak up bits that decode to nothing.
            if s.is_finite() {
                heap.push(Candidate { priority: s, bfu: i });
            }
        }

        let mut used = 0usize;
        while let Some(cand) = heap.pop() {
            let i = cand.bfu;
            let wl = word_lengths[i] as usize;
            if wl + 1 >= WORD_LENGTH_BITS.len() {
                continue;
            }
            let extra_bits = (WORD_LENGTH_BITS[wl + 1] - WORD_LENGTH_BITS[wl]) as usize;
            let cost = extra_bits * BFU_SIZES[i];
            if used + cost > budget {
                continue;
            }
            word_lengths[i] = (wl + 1) as u8;
            used += cost;
            heap.push(Candidate {
                priority: cand.priority - DB_PER_BIT * extra_bits as f64,
                bfu: i,
            });
        }

        // The allocation must never exceed the budget.
        let mut total: usize = (0..n_bfu)
            .map(|i| WORD_LENGTH_BITS[word_lengths[i] as usize] as usize * BFU_SIZES[i])
            .sum();
        while total > budget {
            let worst = (0..n_bfu)
                .filter(|&i| word_lengths[i] > 0)
                .max_by_key(|&i| WORD_LENGTH_BITS[word_lengths[i] as usize] as usize * BFU_SIZES[i])
                .expect("over budget with no allocated BFUs");
            let wl = word_lengths[worst] as usize;
            total -= (WORD_LENGTH_BITS[wl] - WORD_LENGTH_BITS[wl - 1]) as usize * BFU_SIZES[worst];
            word_lengths[worst] -= 1;
        }

        word_lengths.truncate(n_bfu);
        Allocation { n_bfu, word_lengths }
    }
}

impl Default for BitAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the smallest selectable BFU count whose excluded tail contributes
/// under 10% of the average included SMR.
fn select_bfu_amount(smr: &[f64; MAX_BFUS]) -> usize {
    let positive = |s: f64| if s.is_finite() { s.max(0.0) } else { 0.0 };
    for &count in &crate::core::constants::BFU_AMOUNTS {
        let included: f64 = smr[..count].iter().map(|&s| positive(s)).sum();
        let excluded: f64 = smr[count..].iter().map(|&s| positive(s)).sum();
        let inc_avg = included / count as f64;
        let exc_avg = if count < MAX_BFUS {
            excluded / (MAX_BFUS - count) as f64
        } else {
            0.0
        };
        if exc_avg <= 0.1 * inc_avg {
            return count;
        }
    }
    MAX_BFUS
}

/// Linear interpolation of the band thresholds along the Bark axis.
fn interpolate(z: f64, thresholds: &[f64; NUM_BARK_BANDS], centers: &[f64; NUM_BARK_BANDS]) -> f64 {
    if z <= centers[0] {
        return thresholds[0];
    }
    if z >= centers[NUM_BARK_BANDS - 1] {
        return thresholds[NUM_BARK_BANDS - 1];
    }
    let hi = centers.iter().position(|&c| c >= z).unwrap();
    let lo = hi - 1;
    let span = centers[hi] - centers[lo];
    if span <= 0.0 {
        return thresholds[lo];
    }
    let t = (z - centers[lo]) / span;
    thresholds[lo] + t * (thresholds[hi] - thresholds[lo])
}
