//! ATRAC1-compatible perceptual audio codec core.
//!
//! One 512-sample 44.1 kHz PCM frame maps to one 212-byte sound unit per
//! channel. The encoder pipeline is a two-stage QMF band split, per-band
//! transient detection selecting long or short MDCT blocks, psychoacoustic
//! masking analysis, SMR-driven bit allocation over 52 block floating units
//! and bit-exact serialization; the decoder mirrors it. Channels are coded
//! independently; the AEA container interleaves their units.
//!
//! Entry points:
//! - [`Encoder`] / [`Decoder`] for frame-at-a-time processing,
//! - [`StreamingEncoder`] / [`StreamingDecoder`] for sample streams with
//!   flush padding and delay compensation,
//! - [`serialize_frame`] / [`deserialize_frame`] for the wire format,
//! - [`AeaHeader`] for the container header.

#![allow(clippy::needless_range_loop)]

pub mod aea;
pub mod bitstream;
pub mod core;
pub mod decoder;
pub mod encoder;
pub mod quant;
pub mod streaming;
pub mod transform;

mod error;

pub use crate::aea::{AeaHeader, AEA_HEADER_SIZE, AEA_MAGIC};
pub use crate::bitstream::{deserialize_frame, pack_bits, serialize_frame, unpack_bits};
pub use crate::core::constants::{
    CODEC_DELAY, FRAME_SAMPLES, MAX_BFUS, SAMPLE_RATE, SOUND_UNIT_SIZE,
};
pub use crate::core::types::{BlockMode, BlockModes, EncodedFrame, EncoderOptions};
pub use crate::decoder::Decoder;
pub use crate::encoder::Encoder;
pub use crate::error::{AtracError, AtracResult};
pub use crate::quant::Quantizer;
pub use crate::streaming::{StreamingDecoder, StreamingEncoder};
