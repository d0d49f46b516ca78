use thiserror::Error;

/// Errors surfaced at the codec API boundary.
///
/// The core never recovers internally: validation failures are returned to
/// the caller, while numeric edge cases inside the pipeline (silent frames,
/// missing previous spectra, tiny energies) degrade to benign defaults
/// instead of erroring.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtracError {
    #[error("invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },
    #[error("invalid AEA magic: {0:02x?}")]
    InvalidMagic([u8; 4]),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("invalid title: {0}")]
    InvalidTitle(String),
    #[error("truncated input: needed {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },
}

pub type AtracResult<T> = std::result::Result<T, AtracError>;
