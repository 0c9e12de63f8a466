//! Window function coefficients.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Rectangular,
    Hamming,
    Hann,
    Blackman,
}

pub const WINDOW_CHOICES: [(&str, WindowType); 4] = [
    ("rectangular", WindowType::Rectangular),
    ("hamming", WindowType::Hamming),
    ("hann", WindowType::Hann),
    ("blackman", WindowType::Blackman),
];

/// Precomputes the window coefficients for one window length.
pub fn coefficients(kind: WindowType, length: usize) -> Vec<f32> {
    let mut window = Vec::with_capacity(length);
    if length < 2 {
        window.resize(length, 1.0);
        return window;
    }
    let denom = (length - 1) as f32;
    for i in 0..length {
        let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
        let value = match kind {
            WindowType::Rectangular => 1.0,
            WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
            WindowType::Hann => 0.5 * (1.0 - phase.cos()),
            WindowType::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
        };
        window.push(value);
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangular_is_all_ones() {
        assert!(coefficients(WindowType::Rectangular, 32)
            .iter()
            .all(|&v| v == 1.0));
    }

    #[test]
    fn hamming_endpoints_and_symmetry() {
        let w = coefficients(WindowType::Hamming, 65);
        assert!((w[0] - 0.08).abs() < 1e-5);
        assert!((w[64] - 0.08).abs() < 1e-5);
        assert!((w[32] - 1.0).abs() < 1e-5);
        for i in 0..32 {
            assert!((w[i] - w[64 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn hann_vanishes_at_the_edges() {
        let w = coefficients(WindowType::Hann, 33);
        assert!(w[0].abs() < 1e-6);
        assert!(w[32].abs() < 1e-6);
        assert!((w[16] - 1.0).abs() < 1e-6);
    }
}
