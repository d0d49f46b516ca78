//! Signal transforms: FFT front end, MDCT/IMDCT band stages, QMF trees.

pub mod fft;
pub mod mdct;
pub mod qmf;

pub use fft::FftEngine;
pub use mdct::{overlap_add, sine_window, BandImdct, BandMdct, Mdct};
pub use qmf::{QmfAnalysis, QmfAnalysisTree, QmfSynthesis, QmfSynthesisTree};
