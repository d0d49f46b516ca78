//! Transform-layer properties: FFT identities, band MDCT reconstruction,
//! QMF tree behavior.

use libatrac1_audio::core::types::{BlockMode, BlockModes};
use libatrac1_audio::transform::{BandImdct, BandMdct, FftEngine, QmfAnalysisTree};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

fn lcg(seed: u64) -> impl FnMut() -> f64 {
    let mut state = seed;
    move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    }
}

#[test]
fn fft_parseval_identity() {
    let mut engine = FftEngine::new();
    let n = 128;
    let mut rand = lcg(3);
    let time: Vec<Complex<f64>> = (0..n).map(|_| Complex::new(rand(), 0.0)).collect();

    let mut freq = time.clone();
    engine.forward(&mut freq);

    let time_energy: f64 = time.iter().map(|z| z.norm_sqr()).sum();
    let freq_energy: f64 = freq.iter().map(|z| z.norm_sqr()).sum::<f64>() / n as f64;
    assert!((time_energy - freq_energy).abs() < 1e-9 * time_energy.max(1.0));
}

#[test]
fn fft_linearity() {
    let mut engine = FftEngine::new();
    let n = 64;
    let mut rand = lcg(17);
    let a: Vec<Complex<f64>> = (0..n).map(|_| Complex::new(rand(), 0.0)).collect();
    let b: Vec<Complex<f64>> = (0..n).map(|_| Complex::new(rand(), 0.0)).collect();

    let mut fa = a.clone();
    let mut fb = b.clone();
    let mut fsum: Vec<Complex<f64>> = a.iter().zip(b.iter()).map(|(x, y)| x + y).collect();
    engine.forward(&mut fa);
    engine.forward(&mut fb);
    engine.forward(&mut fsum);

    for i in 0..n {
        assert!((fsum[i] - (fa[i] + fb[i])).norm() < 1e-9);
    }
}

/// Drive the forward and inverse band stages over several frames and check
/// that each band comes back as the input delayed by 32 band samples.
fn band_stage_round_trip(mode_sequence: &[BlockModes]) {
    let mut engine = FftEngine::new();
    let mut fwd = BandMdct::new(&mut engine);
    let mut inv = BandImdct::new(&mut engine);

    let frames = mode_sequence.len();
    let mut rand = lcg(99);

    // Smooth but non-trivial band signals.
    let make_stream = |len: usize, rand: &mut dyn FnMut() -> f64| -> Vec<f32> {
        let mut v = Vec::with_capacity(len);
        let mut phase: f64 = 0.0;
        for i in 0..len {
            phase += 0.07 + 0.01 * rand();
            v.push((phase.sin() * 0.6 + (i as f64 * 0.013).cos() * 0.3) as f32);
        }
        v
    };
    let low_stream = make_stream(128 * frames, &mut rand);
    let mid_stream = make_stream(128 * frames, &mut rand);
    let high_stream = make_stream(256 * frames, &mut rand);

    let mut low_out = Vec::new();
    let mut mid_out = Vec::new();
    let mut high_out = Vec::new();

    let mut spectrum = vec![0.0f32; 512];
    let mut low = vec![0.0f32; 128];
    let mut mid = vec![0.0f32; 128];
    let mut high = vec![0.0f32; 256];

    for (f, &modes) in mode_sequence.iter().enumerate() {
        fwd.process(
            &low_stream[f * 128..(f + 1) * 128],
            &mid_stream[f * 128..(f + 1) * 128],
            &high_stream[f * 256..(f + 1) * 256],
            modes,
            &mut spectrum,
        );
        inv.process(&spectrum, modes, &mut low, &mut mid, &mut high);
        low_out.extend_from_slice(&low);
        mid_out.extend_from_slice(&mid);
        high_out.extend_from_slice(&high);
    }

    let check = |name: &str, input: &[f32], output: &[f32], band_len: usize| {
        // Skip the first frame (tail warm-up) and the last 32 samples that
        // are still in flight.
        let mut err_sum = 0.0f64;
        let mut count = 0;
        for i in band_len..input.len() - 32 {
            let delta = (input[i] as f64 - output[i + 32] as f64).abs();
            err_sum += delta;
            count += 1;
        }
        let mae = err_sum / count as f64;
        assert!(mae < 1.0 / band_len as f64, "{}: MAE {}", name, mae);
    };
    check("low", &low_stream, &low_out, 128);
    check("mid", &mid_stream, &mid_out, 128);
    check("high", &high_stream, &high_out, 256);
}

#[test]
fn band_mdct_reconstructs_long_blocks() {
    band_stage_round_trip(&[BlockModes::ALL_LONG; 4]);
}

#[test]
fn band_mdct_reconstructs_short_blocks() {
    let short = BlockModes {
        low: BlockMode::Short,
        mid: BlockMode::Short,
        high: BlockMode::Short,
    };
    band_stage_round_trip(&[short; 4]);
}

#[test]
fn band_mdct_reconstructs_across_mode_transitions() {
    let short = BlockModes {
        low: BlockMode::Short,
        mid: BlockMode::Short,
        high: BlockMode::Short,
    };
    let mixed = BlockModes {
        low: BlockMode::Long,
        mid: BlockMode::Short,
        high: BlockMode::Long,
    };
    band_stage_round_trip(&[
        BlockModes::ALL_LONG,
        short,
        BlockModes::ALL_LONG,
        mixed,
        short,
        BlockModes::ALL_LONG,
    ]);
}

#[test]
fn qmf_tree_separates_bands() {
    // A 1 kHz tone belongs to the low band; the mid and high bands should
    // carry almost nothing.
    let mut tree = QmfAnalysisTree::new();
    let mut low = vec![0.0f32; 128];
    let mut mid = vec![0.0f32; 128];
    let mut high = vec![0.0f32; 256];

    let mut low_energy = 0.0f64;
    let mut mid_energy = 0.0f64;
    let mut high_energy = 0.0f64;
    for f in 0..8 {
        let pcm: Vec<f32> = (0..512)
            .map(|i| {
                let n = (f * 512 + i) as f64;
                (2.0 * PI * 1000.0 * n / 44100.0).sin() as f32
            })
            .collect();
        tree.analyze(&pcm, &mut low, &mut mid, &mut high);
        if f >= 2 {
            low_energy += low.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>();
            mid_energy += mid.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>();
            high_energy += high.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>();
        }
    }

    assert!(low_energy > 100.0 * mid_energy, "low {} mid {}", low_energy, mid_energy);
    assert!(low_energy > 100.0 * high_energy, "low {} high {}", low_energy, high_energy);
}
