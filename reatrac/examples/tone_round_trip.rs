//! Generate a test tone, push it through the codec and report the error.
//!
//! ```sh
//! cargo run --example tone_round_trip
//! ```

use libatrac1_audio::{EncoderOptions, StreamingDecoder, StreamingEncoder};
use std::f32::consts::PI;

fn main() {
    let seconds = 2.0;
    let samples = (44100.0 * seconds) as usize;
    let input: Vec<f32> = (0..samples)
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / 44100.0).sin())
        .collect();

    let mut encoder = StreamingEncoder::new(EncoderOptions::default()).unwrap();
    encoder.push_samples(&input);
    encoder.finish();

    let mut decoder = StreamingDecoder::new();
    let mut units = 0usize;
    while let Some(unit) = encoder.next_unit() {
        decoder.push_unit(&unit).unwrap();
        units += 1;
    }

    let mut output = Vec::new();
    while let Some(frame) = decoder.next_frame() {
        output.extend_from_slice(&frame);
    }
    if let Some(tail) = decoder.finish() {
        output.extend_from_slice(&tail);
    }

    let compare = samples.min(output.len());
    let mae: f64 = input[..compare]
        .iter()
        .zip(output[..compare].iter())
        .map(|(&a, &b)| (a as f64 - b as f64).abs())
        .sum::<f64>()
        / compare as f64;

    println!("Encoded {} samples into {} sound units ({} bytes)", samples, units, units * 212);
    println!("Bitrate: {:.1} kbit/s", units as f64 * 212.0 * 8.0 / seconds as f64 / 1000.0);
    println!("Mean absolute reconstruction error: {:.5}", mae);
}
