//! DSP kernels the transforms delegate to.
//!
//! The engine composes and schedules transforms; the numeric work lives
//! here: FFT plans (over `rustfft`), cosine-table DCTs, window functions,
//! psychoacoustic scale maps and statistical moments.

pub mod dct;
pub mod fft;
pub mod moments;
pub mod scales;
pub mod window_fn;
