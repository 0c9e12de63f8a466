//! Psychoacoustic scale maps used by the filter bank.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Mel,
    Bark,
    Midi,
}

pub const SCALE_CHOICES: [(&str, Scale); 4] = [
    ("linear", Scale::Linear),
    ("mel", Scale::Mel),
    ("bark", Scale::Bark),
    ("midi", Scale::Midi),
];

/// Maps a linear frequency in Hz onto the chosen scale.
pub fn linear_to_scale(scale: Scale, freq: f32) -> f32 {
    match scale {
        Scale::Linear => freq,
        Scale::Mel => 1127.0 * (1.0 + freq / 700.0).ln(),
        Scale::Bark => {
            8.96 * (0.978 + 5.0 * (0.994 + ((freq + 75.4) / 2173.0).powf(1.347)).ln()).ln()
        }
        Scale::Midi => 69.0 + 12.0 * (freq / 440.0).log2(),
    }
}

/// Maps a scale value back to a linear frequency in Hz.
pub fn scale_to_linear(scale: Scale, value: f32) -> f32 {
    match scale {
        Scale::Linear => value,
        Scale::Mel => 700.0 * ((value / 1127.0).exp() - 1.0),
        Scale::Bark => {
            2173.0 * ((((value / 8.96).exp() - 0.978) / 5.0).exp() - 0.994).powf(1.0 / 1.347)
                - 75.4
        }
        Scale::Midi => 440.0 * ((value - 69.0) / 12.0).exp2(),
    }
}
