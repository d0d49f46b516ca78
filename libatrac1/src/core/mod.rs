//! common types and tables for the codec core

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{BlockMode, BlockModes, EncodedFrame, EncoderOptions};
