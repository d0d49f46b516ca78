//! End-to-end codec behavior: structural invariants of encoded frames,
//! silence, tone reproduction, noise budgeting, transient response.

use libatrac1_audio::core::constants::{
    BFU_AMOUNTS, BITS_PER_BFU_METADATA, FRAME_BITS, FRAME_OVERHEAD_BITS,
};
use libatrac1_audio::{
    serialize_frame, BlockMode, CODEC_DELAY, Decoder, EncodedFrame, Encoder, EncoderOptions,
    FRAME_SAMPLES, SAMPLE_RATE, StreamingDecoder, StreamingEncoder,
};
use std::f32::consts::PI;

fn assert_structurally_valid(frame: &EncodedFrame) {
    assert!(BFU_AMOUNTS.contains(&frame.n_bfu()));
    assert!(frame.word_lengths.iter().all(|&wl| wl <= 15));
    assert!(frame.scale_factors.iter().all(|&sf| sf <= 63));
    let budget = FRAME_BITS - FRAME_OVERHEAD_BITS - frame.n_bfu() * BITS_PER_BFU_METADATA;
    assert!(
        frame.data_bits() <= budget,
        "{} data bits over budget {}",
        frame.data_bits(),
        budget
    );
    assert_eq!(serialize_frame(frame).len(), 212);
}

fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

fn noise(amplitude: f32, len: usize) -> Vec<f32> {
    let mut state = 0x9e3779b97f4a7c15u64;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            amplitude * ((state >> 11) as f32 / (1u64 << 52) as f32 - 1.0)
        })
        .collect()
}

/// Run a full stream through encode and decode with delay compensation.
fn round_trip(samples: &[f32]) -> Vec<f32> {
    let mut enc = StreamingEncoder::new(EncoderOptions::default()).unwrap();
    enc.push_samples(samples);
    enc.finish();

    let mut dec = StreamingDecoder::new();
    while let Some(unit) = enc.next_unit() {
        dec.push_unit(&unit).unwrap();
    }
    let mut out = Vec::new();
    while let Some(frame) = dec.next_frame() {
        out.extend_from_slice(&frame);
    }
    if let Some(tail) = dec.finish() {
        out.extend_from_slice(&tail);
    }
    out
}

#[test]
fn silence_frame_spends_no_coefficient_bits() {
    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();
    let frame = encoder.encode_frame(&[0.0; FRAME_SAMPLES]);
    assert_structurally_valid(&frame);
    assert_eq!(frame.data_bits(), 0);
    assert!(frame.word_lengths.iter().all(|&wl| wl == 0));
}

#[test]
fn silence_round_trips_to_silence() {
    let out = round_trip(&vec![0.0f32; 4 * FRAME_SAMPLES]);
    assert!(out.len() >= 4 * FRAME_SAMPLES);
    assert!(out.iter().all(|&s| s.abs() < 1e-6));
}

#[test]
fn tone_reproduces_within_tolerance() {
    let frames = 30;
    let input = sine(440.0, 0.5, frames * FRAME_SAMPLES);
    let out = round_trip(&input);
    assert!(out.len() >= (frames - 1) * FRAME_SAMPLES);

    // Compare a middle-of-stream frame sample by sample; the streaming
    // decoder has already compensated the codec delay.
    let start = 10 * FRAME_SAMPLES;
    let end = start + FRAME_SAMPLES;
    let mae: f64 = input[start..end]
        .iter()
        .zip(out[start..end].iter())
        .map(|(&a, &b)| (a as f64 - b as f64).abs())
        .sum::<f64>()
        / FRAME_SAMPLES as f64;
    assert!(mae < 0.1, "MAE {}", mae);
}

#[test]
fn loud_tone_survives_the_band_gain() {
    // Near-full-scale low-frequency content must not collapse against the
    // top of the scale-factor table.
    let frames = 20;
    let input = sine(300.0, 0.95, frames * FRAME_SAMPLES);
    let out = round_trip(&input);

    let start = 8 * FRAME_SAMPLES;
    let end = start + FRAME_SAMPLES;
    let peak_out = out[start..end].iter().fold(0.0f32, |m, &s| m.max(s.abs()));
    assert!(peak_out > 0.7, "peak {}", peak_out);
}

#[test]
fn noise_respects_the_bit_budget() {
    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();
    let input = noise(0.5, 8 * FRAME_SAMPLES);
    for chunk in input.chunks(FRAME_SAMPLES) {
        let mut pcm = [0.0f32; FRAME_SAMPLES];
        pcm.copy_from_slice(chunk);
        let frame = encoder.encode_frame(&pcm);
        assert_structurally_valid(&frame);
    }
}

#[test]
fn burst_after_silence_triggers_short_blocks() {
    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();

    let silent = [0.0f32; FRAME_SAMPLES];
    encoder.encode_frame(&silent);

    // Burst starting mid-frame: broadband onset.
    let burst_tail = noise(0.9, FRAME_SAMPLES / 2);
    let mut burst = [0.0f32; FRAME_SAMPLES];
    burst[FRAME_SAMPLES / 2..].copy_from_slice(&burst_tail);

    let frame2 = encoder.encode_frame(&burst);
    let mut follow = [0.0f32; FRAME_SAMPLES];
    follow.copy_from_slice(&noise(0.9, FRAME_SAMPLES));
    let frame3 = encoder.encode_frame(&follow);

    let any_short = |f: &EncodedFrame| {
        [f.block_modes.low, f.block_modes.mid, f.block_modes.high]
            .iter()
            .any(|&m| m == BlockMode::Short)
    };
    assert!(
        any_short(&frame2) || any_short(&frame3),
        "burst did not trigger short blocks: {:?} / {:?}",
        frame2.block_modes,
        frame3.block_modes
    );
}

#[test]
fn short_block_frames_round_trip_through_the_wire() {
    // Force short blocks with hair-trigger thresholds and make sure the
    // serialized stream still decodes consistently.
    let options = EncoderOptions::default().with_transient_thresholds(0.01, 0.01, 0.01);
    let mut enc = StreamingEncoder::new(options).unwrap();
    let input = noise(0.4, 12 * FRAME_SAMPLES);
    enc.push_samples(&input);
    enc.finish();

    let mut dec = StreamingDecoder::new();
    let mut total = 0;
    while let Some(unit) = enc.next_unit() {
        dec.push_unit(&unit).unwrap();
    }
    while let Some(frame) = dec.next_frame() {
        assert!(frame.iter().all(|s| s.is_finite() && s.abs() < 4.0));
        total += frame.len();
    }
    assert!(total >= 12 * FRAME_SAMPLES);
}

#[test]
fn decoder_matches_logical_and_wire_paths() {
    let mut encoder = Encoder::new(EncoderOptions::default()).unwrap();
    let mut wire_decoder = Decoder::new();
    let mut logical_decoder = Decoder::new();

    let input = sine(2000.0, 0.3, 4 * FRAME_SAMPLES);
    for chunk in input.chunks(FRAME_SAMPLES) {
        let mut pcm = [0.0f32; FRAME_SAMPLES];
        pcm.copy_from_slice(chunk);
        let frame = encoder.encode_frame(&pcm);

        let from_logical = logical_decoder.decode_frame(&frame);
        let reparsed = libatrac1_audio::deserialize_frame(&serialize_frame(&frame)).unwrap();
        let from_wire = wire_decoder.decode_frame(&reparsed);
        assert_eq!(from_logical[..], from_wire[..]);
    }
}

#[test]
fn invalid_options_are_rejected() {
    let options = EncoderOptions::default().with_transient_thresholds(0.0, 1.5, 2.0);
    assert!(Encoder::new(options).is_err());

    let options = EncoderOptions::default().with_transient_thresholds(1.0, 1.5, 4.5);
    assert!(Encoder::new(options).is_err());

    assert!(Encoder::new(EncoderOptions::default()).is_ok());
}

#[test]
fn codec_delay_constant() {
    assert_eq!(CODEC_DELAY, 266);
}
