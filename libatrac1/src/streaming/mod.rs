//! Push/pull streaming wrappers around the frame codec.
//!
//! [`StreamingEncoder`] buffers arbitrary sample chunks into 512-sample
//! frames and emits serialized sound units; [`StreamingDecoder`] consumes
//! sound units, drops the codec delay and rebuffers the output into
//! 512-sample frames. Both are single-channel; a stereo caller runs two
//! instances and interleaves units itself.

use std::collections::VecDeque;

use crate::bitstream::{deserialize_frame, serialize_frame};
use crate::core::constants::{CODEC_DELAY, FRAME_SAMPLES, SOUND_UNIT_SIZE};
use crate::core::types::EncoderOptions;
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::AtracResult;

pub struct StreamingEncoder {
    encoder: Encoder,
    sample_buffer: Vec<f32>,
    pending: VecDeque<[u8; SOUND_UNIT_SIZE]>,
    frame: [f32; FRAME_SAMPLES],
    finished: bool,
}

impl StreamingEncoder {
    pub fn new(options: EncoderOptions) -> AtracResult<Self> {
        Ok(StreamingEncoder {
            encoder: Encoder::new(options)?,
            sample_buffer: Vec::with_capacity(FRAME_SAMPLES * 2),
            pending: VecDeque::new(),
            frame: [0.0; FRAME_SAMPLES],
            finished: false,
        })
    }

    /// Feed PCM samples; any chunk size is fine.
    pub fn push_samples(&mut self, samples: &[f32]) {
        debug_assert!(!self.finished, "push after finish");
        self.sample_buffer.extend_from_slice(samples);
        self.encode_full_frames();
    }

    /// Next serialized sound unit, if one is ready.
    pub fn next_unit(&mut self) -> Option<[u8; SOUND_UNIT_SIZE]> {
        self.pending.pop_front()
    }

    /// Number of sound units ready to be pulled.
    pub fn pending_units(&self) -> usize {
        self.pending.len()
    }

    /// End of stream: zero-pad the final partial frame, and when the padding
    /// cannot cover the codec delay, emit one extra all-zero frame so the
    /// decoder can flush the tail of the real signal.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let leftover = self.sample_buffer.len();
        debug_assert!(leftover < FRAME_SAMPLES);
        let padding = FRAME_SAMPLES - leftover;

        if leftover > 0 {
            self.frame[..leftover].copy_from_slice(&self.sample_buffer);
            self.frame[leftover..].fill(0.0);
            let encoded = self.encoder.encode_frame(&self.frame);
            self.pending.push_back(serialize_frame(&encoded));
            self.sample_buffer.clear();
        }
        if padding < CODEC_DELAY || leftover == 0 {
            self.frame.fill(0.0);
            let encoded = self.encoder.encode_frame(&self.frame);
            self.pending.push_back(serialize_frame(&encoded));
        }
    }

    fn encode_full_frames(&mut self) {
        let mut consumed = 0;
        while self.sample_buffer.len() - consumed >= FRAME_SAMPLES {
            self.frame
                .copy_from_slice(&self.sample_buffer[consumed..consumed + FRAME_SAMPLES]);
            consumed += FRAME_SAMPLES;
            let encoded = self.encoder.encode_frame(&self.frame);
            self.pending.push_back(serialize_frame(&encoded));
        }
        if consumed > 0 {
            self.sample_buffer.drain(..consumed);
        }
    }
}

pub struct StreamingDecoder {
    decoder: Decoder,
    sample_buffer: Vec<f32>,
    to_skip: usize,
}

impl StreamingDecoder {
    pub fn new() -> Self {
        StreamingDecoder {
            decoder: Decoder::new(),
            sample_buffer: Vec::with_capacity(FRAME_SAMPLES * 2),
            to_skip: CODEC_DELAY,
        }
    }

    /// Feed one 212-byte sound unit.
    pub fn push_unit(&mut self, unit: &[u8]) -> AtracResult<()> {
        let frame = deserialize_frame(unit)?;
        let pcm = self.decoder.decode_frame(&frame);
        // Delay compensation: the first CODEC_DELAY decoded samples are
        // start-up transient, not signal.
        let start = self.to_skip.min(FRAME_SAMPLES);
        self.to_skip -= start;
        self.sample_buffer.extend_from_slice(&pcm[start..]);
        Ok(())
    }

    /// Next full 512-sample output frame, if available.
    pub fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.sample_buffer.len() < FRAME_SAMPLES {
            return None;
        }
        let frame: Vec<f32> = self.sample_buffer.drain(..FRAME_SAMPLES).collect();
        Some(frame)
    }

    /// End of stream: whatever remains, shorter than a full frame.
    pub fn finish(&mut self) -> Option<Vec<f32>> {
        if self.sample_buffer.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.sample_buffer))
    }
}

impl Default for StreamingDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_units(encoder: &mut StreamingEncoder) -> Vec<[u8; SOUND_UNIT_SIZE]> {
        let mut units = Vec::new();
        while let Some(u) = encoder.next_unit() {
            units.push(u);
        }
        units
    }

    #[test]
    fn chunk_size_does_not_change_the_unit_stream() {
        let samples: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();

        let mut a = StreamingEncoder::new(EncoderOptions::default()).unwrap();
        a.push_samples(&samples);
        a.finish();
        let units_a = collect_units(&mut a);

        let mut b = StreamingEncoder::new(EncoderOptions::default()).unwrap();
        for chunk in samples.chunks(171) {
            b.push_samples(chunk);
        }
        b.finish();
        let units_b = collect_units(&mut b);

        assert_eq!(units_a.len(), units_b.len());
        for (ua, ub) in units_a.iter().zip(units_b.iter()) {
            assert_eq!(ua[..], ub[..]);
        }
    }

    #[test]
    fn flush_padding_rules() {
        // Exactly 2 frames of input: one extra all-zero frame is appended so
        // the decoder can reach the tail.
        let mut enc = StreamingEncoder::new(EncoderOptions::default()).unwrap();
        enc.push_samples(&vec![0.1f32; 1024]);
        enc.finish();
        assert_eq!(collect_units(&mut enc).len(), 3);

        // A long partial frame (padding < 266) also needs the extra frame.
        let mut enc = StreamingEncoder::new(EncoderOptions::default()).unwrap();
        enc.push_samples(&vec![0.1f32; 1024 + 400]);
        enc.finish();
        assert_eq!(collect_units(&mut enc).len(), 4);

        // A short partial frame (padding >= 266) does not.
        let mut enc = StreamingEncoder::new(EncoderOptions::default()).unwrap();
        enc.push_samples(&vec![0.1f32; 1024 + 100]);
        enc.finish();
        assert_eq!(collect_units(&mut enc).len(), 3);
    }

    #[test]
    fn decoder_drops_the_codec_delay() {
        let mut enc = StreamingEncoder::new(EncoderOptions::default()).unwrap();
        enc.push_samples(&vec![0.0f32; 4 * FRAME_SAMPLES]);
        enc.finish();

        let mut dec = StreamingDecoder::new();
        let mut total = 0;
        while let Some(unit) = enc.next_unit() {
            dec.push_unit(&unit).unwrap();
        }
        while let Some(frame) = dec.next_frame() {
            assert_eq!(frame.len(), FRAME_SAMPLES);
            total += frame.len();
        }
        if let Some(tail) = dec.finish() {
            assert!(tail.len() < FRAME_SAMPLES);
            total += tail.len();
        }
        // 5 units decoded, minus the 266-sample delay.
        assert_eq!(total, 5 * FRAME_SAMPLES - CODEC_DELAY);
    }
}
