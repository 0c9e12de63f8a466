//! Cosine-table DCT-II and DCT-III of a fixed length.
//!
//! The table is precomputed once per plan (transform `initialize` time);
//! feature vectors passed through the DCT are short, so the quadratic
//! evaluation stays cheap and exactly reproducible.

/// A prepared DCT of length `n`. `dct3` is scaled so `dct3(dct2(x)) == x`.
pub struct DctPlan {
    n: usize,
    /// `cos[k * n + j] = cos(pi * k * (2j + 1) / (2n))`
    cos: Vec<f32>,
}

impl DctPlan {
    pub fn new(n: usize) -> Self {
        let mut cos = Vec::with_capacity(n * n);
        for k in 0..n {
            for j in 0..n {
                let angle =
                    std::f64::consts::PI * k as f64 * (2 * j + 1) as f64 / (2 * n) as f64;
                cos.push(angle.cos() as f32);
            }
        }
        Self { n, cos }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    /// DCT-II: `out[k] = sum_j in[j] * cos(pi k (2j+1) / 2n)`.
    pub fn dct2(&self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.n);
        debug_assert_eq!(output.len(), self.n);
        for (k, slot) in output.iter_mut().enumerate() {
            let row = &self.cos[k * self.n..(k + 1) * self.n];
            *slot = input.iter().zip(row).map(|(x, c)| x * c).sum();
        }
    }

    /// DCT-III, the inverse of [`Self::dct2`] up to rounding.
    pub fn dct3(&self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.n);
        debug_assert_eq!(output.len(), self.n);
        let norm = 2.0 / self.n as f32;
        for (j, slot) in output.iter_mut().enumerate() {
            let mut acc = input[0] / 2.0;
            for k in 1..self.n {
                acc += input[k] * self.cos[k * self.n + j];
            }
            *slot = acc * norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dct_round_trip() {
        let n = 40;
        let plan = DctPlan::new(n);
        let signal: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).sin()).collect();
        let mut coeffs = vec![0.0f32; n];
        let mut restored = vec![0.0f32; n];
        plan.dct2(&signal, &mut coeffs);
        plan.dct3(&coeffs, &mut restored);
        for (a, b) in signal.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn constant_signal_concentrates_in_dc() {
        let n = 16;
        let plan = DctPlan::new(n);
        let signal = vec![1.0f32; n];
        let mut coeffs = vec![0.0f32; n];
        plan.dct2(&signal, &mut coeffs);
        assert!((coeffs[0] - n as f32).abs() < 1e-4);
        for c in &coeffs[1..] {
            assert!(c.abs() < 1e-4);
        }
    }
}
