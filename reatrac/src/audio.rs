use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Read an audio file and return (samples, sample_rate, channels).
/// Samples are interleaved f32 in [-1.0, 1.0].
pub fn read_audio_file(path: &Path) -> Result<(Vec<f32>, u32, usize)> {
    let src = File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Unsupported audio format")?;
    let mut reader = probed.format;

    let track = reader.default_track().context("No audio track found")?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    let sample_rate = params.sample_rate.context("Unknown sample rate")?;
    let channels = params
        .channels
        .map(|c| c.count())
        .context("Unknown channel count")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("Error reading packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(audio) => append_interleaved(&mut samples, &audio),
            // A corrupt packet is skippable; anything else is fatal.
            Err(SymError::DecodeError(_)) => {}
            Err(e) => return Err(e).context("Error decoding packet"),
        }
    }

    Ok((samples, sample_rate, channels))
}

/// Interleave one decoded buffer onto `out`, normalizing to f32.
fn append_interleaved(out: &mut Vec<f32>, audio: &AudioBufferRef) {
    match audio {
        AudioBufferRef::F32(planes) => extend_normalized(out, planes, |s| s),
        AudioBufferRef::S16(planes) => {
            extend_normalized(out, planes, |s| s as f32 / -(i16::MIN as f32))
        }
        AudioBufferRef::S32(planes) => {
            extend_normalized(out, planes, |s| s as f32 / -(i32::MIN as f32))
        }
        AudioBufferRef::U8(planes) => {
            extend_normalized(out, planes, |s| f32::from(s) / 128.0 - 1.0)
        }
        // Other layouts aren't produced by the WAV/PCM readers this crate
        // enables.
        _ => {}
    }
}

fn extend_normalized<S, F>(out: &mut Vec<f32>, planes: &AudioBuffer<S>, to_f32: F)
where
    S: Sample,
    F: Fn(S) -> f32,
{
    let channels = planes.spec().channels.count();
    out.reserve(planes.frames() * channels);
    for frame in 0..planes.frames() {
        for ch in 0..channels {
            out.push(to_f32(planes.chan(ch)[frame]));
        }
    }
}

/// Write samples to a WAV file (32-bit float RIFF).
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: usize) -> Result<()> {
    let bytes = write_wav_to_bytes(samples, sample_rate, channels)?;
    std::fs::write(path, bytes).context("Failed to write WAV file")
}

/// Write samples to WAV format in memory (32-bit IEEE float).
pub fn write_wav_to_bytes(samples: &[f32], sample_rate: u32, channels: usize) -> Result<Vec<u8>> {
    const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;
    const BYTES_PER_SAMPLE: u32 = 4;

    let block_align = channels as u32 * BYTES_PER_SAMPLE;

    // fmt chunk payload.
    let mut fmt = Vec::with_capacity(16);
    fmt.extend_from_slice(&WAVE_FORMAT_IEEE_FLOAT.to_le_bytes());
    fmt.extend_from_slice(&(channels as u16).to_le_bytes());
    fmt.extend_from_slice(&sample_rate.to_le_bytes());
    fmt.extend_from_slice(&(sample_rate * block_align).to_le_bytes());
    fmt.extend_from_slice(&(block_align as u16).to_le_bytes());
    fmt.extend_from_slice(&((8 * BYTES_PER_SAMPLE) as u16).to_le_bytes());

    let data_len = samples.len() as u32 * BYTES_PER_SAMPLE;
    let riff_len = 4 + (8 + fmt.len() as u32) + (8 + data_len);

    let mut out = Vec::with_capacity(8 + riff_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
    out.extend_from_slice(&fmt);

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }

    Ok(out)
}
