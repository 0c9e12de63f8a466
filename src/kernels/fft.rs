//! Real FFT plans over `rustfft`.
//!
//! The forward transform of `n` real samples produces `n + 2` floats laid
//! out as interleaved re/im pairs for bins `0..=n/2` (DC through Nyquist).
//! The inverse consumes the same layout and reproduces `2 * (pairs - 1)`
//! samples, scaled by `1/n`.
//!
//! Plans are shared between deduplicated tree nodes and may be driven from
//! several worker threads at once, so scratch memory sits in a small
//! try-lock pool (one slot per worker); a caller that finds every slot busy
//! spins briefly and retries.

use std::sync::{Arc, Mutex};

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::transform::max_worker_threads;

struct Scratch {
    signal: Vec<Complex<f32>>,
    work: Vec<Complex<f32>>,
}

pub(crate) struct ScratchPool {
    slots: Vec<Mutex<Scratch>>,
}

impl ScratchPool {
    fn new(signal_len: usize, work_len: usize) -> Self {
        let slots = (0..max_worker_threads())
            .map(|_| {
                Mutex::new(Scratch {
                    signal: vec![Complex::default(); signal_len],
                    work: vec![Complex::default(); work_len],
                })
            })
            .collect();
        Self { slots }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Scratch) -> R) -> R {
        loop {
            for slot in &self.slots {
                if let Ok(mut guard) = slot.try_lock() {
                    return f(&mut guard);
                }
            }
            std::hint::spin_loop();
        }
    }
}

/// A prepared 1-D real FFT of a fixed length.
pub struct RealFftPlan {
    n: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: ScratchPool,
}

impl RealFftPlan {
    pub fn new(n: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        let work_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            n,
            forward,
            inverse,
            scratch: ScratchPool::new(n, work_len),
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    /// Number of complex bins the forward transform produces.
    pub fn bins(&self) -> usize {
        self.n / 2 + 1
    }

    /// Forward real FFT: `input.len() == n`, `output` holds `bins()`
    /// interleaved re/im pairs.
    pub fn rdft(&self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.n);
        debug_assert!(output.len() >= 2 * self.bins());
        self.scratch.with(|scratch| {
            for (slot, &sample) in scratch.signal.iter_mut().zip(input) {
                *slot = Complex::new(sample, 0.0);
            }
            self.forward
                .process_with_scratch(&mut scratch.signal, &mut scratch.work);
            for (bin, pair) in output.chunks_exact_mut(2).take(self.bins()).enumerate() {
                pair[0] = scratch.signal[bin].re;
                pair[1] = scratch.signal[bin].im;
            }
        });
    }

    /// Inverse real FFT: `input` holds `bins()` pairs, `output.len() == n`.
    pub fn irdft(&self, input: &[f32], output: &mut [f32]) {
        debug_assert!(input.len() >= 2 * self.bins());
        debug_assert_eq!(output.len(), self.n);
        self.scratch.with(|scratch| {
            let bins = self.bins();
            for (bin, pair) in input.chunks_exact(2).take(bins).enumerate() {
                scratch.signal[bin] = Complex::new(pair[0], pair[1]);
            }
            // The upper half of the spectrum is the conjugate mirror.
            for bin in bins..self.n {
                scratch.signal[bin] = scratch.signal[self.n - bin].conj();
            }
            self.inverse
                .process_with_scratch(&mut scratch.signal, &mut scratch.work);
            let norm = 1.0 / self.n as f32;
            for (slot, value) in output.iter_mut().zip(&scratch.signal) {
                *slot = value.re * norm;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_finds_a_pure_tone() {
        let n = 64;
        let plan = RealFftPlan::new(n);
        let tone: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 4.0 * i as f32 / n as f32).sin())
            .collect();
        let mut spectrum = vec![0.0f32; 2 * plan.bins()];
        plan.rdft(&tone, &mut spectrum);
        let magnitudes: Vec<f32> = spectrum
            .chunks_exact(2)
            .map(|p| (p[0] * p[0] + p[1] * p[1]).sqrt())
            .collect();
        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(peak, Some(4));
    }

    #[test]
    fn round_trip_reproduces_the_signal() {
        let n = 500;
        let plan = RealFftPlan::new(n);
        let signal: Vec<f32> = (0..n).map(|i| ((i * 13 % 97) as f32 - 48.0) / 48.0).collect();
        let mut spectrum = vec![0.0f32; 2 * plan.bins()];
        let mut restored = vec![0.0f32; n];
        plan.rdft(&signal, &mut spectrum);
        plan.irdft(&spectrum, &mut restored);
        for (a, b) in signal.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }
}
