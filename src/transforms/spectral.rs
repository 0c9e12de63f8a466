//! Scalar spectral descriptors over magnitude spectra: centroid, rolloff
//! and flux.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{defaults, parse_float, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

/// Frequency step between adjacent magnitude bins: the spectrum spans
/// 0..Nyquist over `bins - 1` intervals.
fn bin_width(format: &BufferFormat) -> f32 {
    format.sampling_rate() as f32 / (2.0 * (format.size().max(2) - 1) as f32)
}

static CENTROID_PARAMETERS: [ParameterDescriptor; 1] = [THREADS_NUM];

/// The magnitude-weighted mean frequency of the spectrum, in Hz.
pub struct Centroid {
    parameters: ParameterMap,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Centroid {
    fn default() -> Self {
        Self {
            parameters: defaults(&CENTROID_PARAMETERS),
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Single),
        }
    }
}

impl Transform for Centroid {
    fn name(&self) -> &'static str {
        "Centroid"
    }

    fn description(&self) -> &'static str {
        "Computes the spectral centroid in Hz."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &CENTROID_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "threads_num" => self.threads = parse_size(self.name(), name, value)?,
            _ => {
                return Err(SfeError::UnknownParameter {
                    class: self.name().to_string(),
                    name: name.to_string(),
                })
            }
        }
        self.parameters.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn input_format(&self) -> &BufferFormat {
        &self.input
    }

    fn output_format(&self) -> &BufferFormat {
        &self.output
    }

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.input = *format;
        self.output = BufferFormat::new(FormatId::Single, 1, format.sampling_rate())?;
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        let df = bin_width(&self.input);
        for_each_row(self.threads, output, |i, row| {
            let spectrum = input.real(i);
            let total: f32 = spectrum.iter().sum();
            let weighted: f32 = spectrum
                .iter()
                .enumerate()
                .map(|(bin, &m)| bin as f32 * df * m)
                .sum();
            row[0] = if total > 0.0 { weighted / total } else { 0.0 };
        });
        Ok(())
    }
}

static ROLLOFF_PARAMETERS: [ParameterDescriptor; 2] = [
    ParameterDescriptor {
        name: "ratio",
        description: "The fraction of total spectral energy below the rolloff point.",
        default: "0.85",
    },
    THREADS_NUM,
];

/// The frequency below which `ratio` of the total magnitude lies, in Hz.
pub struct Rolloff {
    parameters: ParameterMap,
    ratio: f32,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Rolloff {
    fn default() -> Self {
        Self {
            parameters: defaults(&ROLLOFF_PARAMETERS),
            ratio: 0.85,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Single),
        }
    }
}

impl Transform for Rolloff {
    fn name(&self) -> &'static str {
        "Rolloff"
    }

    fn description(&self) -> &'static str {
        "Computes the spectral rolloff frequency in Hz."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &ROLLOFF_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "ratio" => {
                let parsed = parse_float(self.name(), name, value)?;
                if !(parsed > 0.0 && parsed < 1.0) {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.ratio = parsed;
            }
            "threads_num" => self.threads = parse_size(self.name(), name, value)?,
            _ => {
                return Err(SfeError::UnknownParameter {
                    class: self.name().to_string(),
                    name: name.to_string(),
                })
            }
        }
        self.parameters.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn input_format(&self) -> &BufferFormat {
        &self.input
    }

    fn output_format(&self) -> &BufferFormat {
        &self.output
    }

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.input = *format;
        self.output = BufferFormat::new(FormatId::Single, 1, format.sampling_rate())?;
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        let df = bin_width(&self.input);
        let ratio = self.ratio;
        for_each_row(self.threads, output, |i, row| {
            let spectrum = input.real(i);
            let threshold: f32 = spectrum.iter().sum::<f32>() * ratio;
            let mut accumulated = 0.0f32;
            let mut rolloff = spectrum.len().saturating_sub(1);
            for (bin, &m) in spectrum.iter().enumerate() {
                accumulated += m;
                if accumulated >= threshold {
                    rolloff = bin;
                    break;
                }
            }
            row[0] = rolloff as f32 * df;
        });
        Ok(())
    }
}

static FLUX_PARAMETERS: [ParameterDescriptor; 0] = [];

/// The Euclidean distance between each spectrum and its predecessor,
/// normalized by the bin count. The first window has no predecessor and
/// yields zero.
pub struct Flux {
    parameters: ParameterMap,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Flux {
    fn default() -> Self {
        Self {
            parameters: defaults(&FLUX_PARAMETERS),
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Single),
        }
    }
}

impl Transform for Flux {
    fn name(&self) -> &'static str {
        "Flux"
    }

    fn description(&self) -> &'static str {
        "Computes the spectral flux against the previous window."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &FLUX_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, _value: &str) -> SfeResult<()> {
        Err(SfeError::UnknownParameter {
            class: self.name().to_string(),
            name: name.to_string(),
        })
    }

    fn input_format(&self) -> &BufferFormat {
        &self.input
    }

    fn output_format(&self) -> &BufferFormat {
        &self.output
    }

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.input = *format;
        self.output = BufferFormat::new(FormatId::Single, 1, format.sampling_rate())?;
        Ok(buffers_count)
    }

    fn slice_safe(&self) -> bool {
        false
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let bins = self.input.size().max(1) as f32;
        for i in 0..input.count() {
            let value = if i == 0 {
                0.0
            } else {
                let current = input.real(i);
                let previous = input.real(i - 1);
                let distance: f32 = current
                    .iter()
                    .zip(previous)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                distance.sqrt() / bins
            };
            output.real_mut(i)[0] = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    #[test]
    fn centroid_of_a_single_bin() {
        let mut tfm = Centroid::default();
        let bins = 257;
        let fmt = BufferFormat::new(FormatId::Real, bins, 16000).unwrap();
        let mut spectrum = vec![0.0f32; bins];
        spectrum[64] = 1.0;
        let out = run_real(&mut tfm, fmt, &[spectrum]);
        let df = 8000.0 / 256.0;
        assert!((out[0][0] - 64.0 * df).abs() < 1e-3);
    }

    #[test]
    fn rolloff_of_a_flat_spectrum() {
        let mut tfm = Rolloff::default();
        tfm.set_parameter("ratio", "0.5").unwrap();
        let bins = 100;
        let fmt = BufferFormat::new(FormatId::Real, bins, 16000).unwrap();
        let out = run_real(&mut tfm, fmt, &[vec![1.0; bins]]);
        let df = 8000.0 / 99.0;
        // Half of a flat spectrum accumulates at the 49th bin.
        assert!((out[0][0] - 49.0 * df).abs() < df);
    }

    #[test]
    fn rolloff_ratio_must_be_a_fraction() {
        let mut tfm = Rolloff::default();
        assert!(tfm.set_parameter("ratio", "1.0").is_err());
        assert!(tfm.set_parameter("ratio", "0").is_err());
    }

    #[test]
    fn flux_detects_spectrum_changes() {
        let mut tfm = Flux::default();
        let fmt = BufferFormat::new(FormatId::Real, 4, 16000).unwrap();
        let out = run_real(
            &mut tfm,
            fmt,
            &[
                vec![1.0, 0.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
            ],
        );
        assert_eq!(out[0][0], 0.0);
        assert_eq!(out[1][0], 0.0);
        assert!((out[2][0] - 2.0f32.sqrt() / 4.0).abs() < 1e-6);
    }
}
