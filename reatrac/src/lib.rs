//! File-level encode/decode/dump operations shared by the `reatrac` binary.

pub mod audio;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use libatrac1_audio::{
    deserialize_frame, AeaHeader, AtracError, BlockModes, EncoderOptions, SAMPLE_RATE,
    SOUND_UNIT_SIZE, StreamingDecoder, StreamingEncoder, AEA_HEADER_SIZE,
};

/// Outcome of an encode run.
pub struct EncodeSummary {
    pub channels: usize,
    pub units_per_channel: usize,
    pub output_bytes: usize,
    pub duration_secs: f64,
}

/// Outcome of a decode run.
#[derive(Debug)]
pub struct DecodeSummary {
    pub title: String,
    pub channels: usize,
    pub samples_per_channel: usize,
}

/// Exit code classification: format/validation failures are distinct from
/// plain I/O or usage problems.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.chain().any(|c| c.downcast_ref::<AtracError>().is_some()) {
        2
    } else {
        1
    }
}

/// Encode a 44.1 kHz WAV file into an AEA file, one independent encoder per
/// channel, units interleaved L,R,L,R,...
pub fn encode_file(input: &Path, output: &Path, title: Option<&str>) -> Result<EncodeSummary> {
    let (samples, sample_rate, channels) =
        audio::read_audio_file(input).context("Failed to read input audio")?;

    if sample_rate != SAMPLE_RATE {
        return Err(AtracError::InvalidOption(format!(
            "input must be {} Hz, got {} Hz (resampling is out of scope)",
            SAMPLE_RATE, sample_rate
        ))
        .into());
    }
    if !(1..=2).contains(&channels) {
        return Err(
            AtracError::InvalidOption(format!("input must be mono or stereo, got {} channels", channels))
                .into(),
        );
    }

    // Deinterleave and run one encoder per channel.
    let samples_per_channel = samples.len() / channels;
    let mut unit_streams: Vec<Vec<[u8; SOUND_UNIT_SIZE]>> = Vec::with_capacity(channels);
    for ch in 0..channels {
        let channel_samples: Vec<f32> = samples
            .iter()
            .skip(ch)
            .step_by(channels)
            .copied()
            .collect();
        let mut encoder = StreamingEncoder::new(EncoderOptions::default())?;
        encoder.push_samples(&channel_samples);
        encoder.finish();

        let mut units = Vec::new();
        while let Some(unit) = encoder.next_unit() {
            units.push(unit);
        }
        unit_streams.push(units);
    }

    let units_per_channel = unit_streams[0].len();
    debug_assert!(unit_streams.iter().all(|u| u.len() == units_per_channel));

    let title = title.unwrap_or("");
    let frame_count = (units_per_channel * channels) as u32;
    let header = AeaHeader::create(title, frame_count, channels as u8)?;

    let mut out = Vec::with_capacity(AEA_HEADER_SIZE + frame_count as usize * SOUND_UNIT_SIZE);
    out.extend_from_slice(&header);
    for i in 0..units_per_channel {
        for stream in &unit_streams {
            out.extend_from_slice(&stream[i]);
        }
    }

    std::fs::write(output, &out).context("Failed to write output file")?;

    Ok(EncodeSummary {
        channels,
        units_per_channel,
        output_bytes: out.len(),
        duration_secs: samples_per_channel as f64 / SAMPLE_RATE as f64,
    })
}

/// Split an AEA file into its header and the per-channel unit streams.
/// Short reads (header or unit payload) are reported here, not by the core.
fn read_aea(data: &[u8]) -> Result<(AeaHeader, Vec<Vec<&[u8]>>)> {
    let header_block: &[u8; AEA_HEADER_SIZE] = data
        .get(..AEA_HEADER_SIZE)
        .and_then(|block| block.try_into().ok())
        .ok_or(AtracError::Truncated {
            needed: AEA_HEADER_SIZE,
            available: data.len(),
        })?;
    let header = AeaHeader::parse(header_block)?;
    let channels = header.channel_count.clamp(1, 2) as usize;

    let payload = &data[AEA_HEADER_SIZE..];
    let needed = header.frame_count as usize * SOUND_UNIT_SIZE;
    if payload.len() < needed {
        return Err(AtracError::Truncated {
            needed: AEA_HEADER_SIZE + needed,
            available: data.len(),
        }
        .into());
    }

    let mut streams: Vec<Vec<&[u8]>> = vec![Vec::new(); channels];
    for (i, unit) in payload[..needed].chunks(SOUND_UNIT_SIZE).enumerate() {
        streams[i % channels].push(unit);
    }
    Ok((header, streams))
}

/// Decode an AEA file to a 32-bit float WAV.
pub fn decode_file(input: &Path, output: &Path) -> Result<DecodeSummary> {
    let data = std::fs::read(input).context("Failed to read AEA file")?;
    let (header, streams) = read_aea(&data)?;
    let channels = streams.len();

    let mut channel_pcm: Vec<Vec<f32>> = Vec::with_capacity(channels);
    for units in &streams {
        let mut decoder = StreamingDecoder::new();
        let mut pcm = Vec::new();
        for unit in units {
            decoder.push_unit(unit)?;
            while let Some(frame) = decoder.next_frame() {
                pcm.extend_from_slice(&frame);
            }
        }
        if let Some(tail) = decoder.finish() {
            pcm.extend_from_slice(&tail);
        }
        channel_pcm.push(pcm);
    }

    let samples_per_channel = channel_pcm.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut interleaved = Vec::with_capacity(samples_per_channel * channels);
    for i in 0..samples_per_channel {
        for pcm in &channel_pcm {
            interleaved.push(pcm[i]);
        }
    }

    audio::write_wav(output, &interleaved, SAMPLE_RATE, channels)?;

    Ok(DecodeSummary {
        title: header.title,
        channels,
        samples_per_channel,
    })
}

#[derive(Serialize)]
struct UnitDump {
    index: usize,
    channel: usize,
    block_modes: BlockModes,
    n_bfu: usize,
    word_lengths: Vec<u8>,
    scale_factors: Vec<u8>,
    data_bits: usize,
}

#[derive(Serialize)]
struct FileDump {
    title: String,
    frame_count: u32,
    channel_count: u8,
    units: Vec<UnitDump>,
}

/// Dump the container header and per-unit frame structure as JSON.
pub fn dump_file(input: &Path, output: &Path) -> Result<usize> {
    let data = std::fs::read(input).context("Failed to read AEA file")?;
    let (header, streams) = read_aea(&data)?;
    let channels = streams.len();

    let mut units = Vec::new();
    for (ch, stream) in streams.iter().enumerate() {
        for (i, unit) in stream.iter().enumerate() {
            let frame = deserialize_frame(unit)?;
            units.push(UnitDump {
                index: i * channels + ch,
                channel: ch,
                block_modes: frame.block_modes,
                n_bfu: frame.n_bfu(),
                data_bits: frame.data_bits(),
                word_lengths: frame.word_lengths,
                scale_factors: frame.scale_factors,
            });
        }
    }
    units.sort_by_key(|u| u.index);

    let dump = FileDump {
        title: header.title,
        frame_count: header.frame_count,
        channel_count: header.channel_count,
        units,
    };

    let json = serde_json::to_string_pretty(&dump).context("Failed to serialize dump")?;
    let count = dump.units.len();
    std::fs::write(output, json).context("Failed to write JSON file")?;
    Ok(count)
}
