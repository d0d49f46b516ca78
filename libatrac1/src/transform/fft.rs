use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

/// Cached-plan FFT front end.
///
/// Plans are created once per size and reused; every caller in the pipeline
/// works in `f64` so that twiddle drift does not accumulate into the
/// psychoacoustic dB math. Sizes must be powers of two.
pub struct FftEngine {
    planner: FftPlanner<f64>,
    plans: HashMap<usize, Arc<dyn Fft<f64>>>,
}

impl FftEngine {
    pub fn new() -> Self {
        FftEngine {
            planner: FftPlanner::new(),
            plans: HashMap::new(),
        }
    }

    /// Get (or create) the forward plan for `size`.
    pub fn plan(&mut self, size: usize) -> Arc<dyn Fft<f64>> {
        assert!(size.is_power_of_two(), "FFT size {} is not a power of 2", size);
        self.plans
            .entry(size)
            .or_insert_with(|| self.planner.plan_fft_forward(size))
            .clone()
    }

    /// In-place forward FFT over a power-of-two length buffer.
    pub fn forward(&mut self, buf: &mut [Complex<f64>]) {
        let plan = self.plan(buf.len());
        plan.process(buf);
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}
