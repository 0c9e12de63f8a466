//! Complex magnitude and spectral energy.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{defaults, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static PARAMETERS: [ParameterDescriptor; 1] = [THREADS_NUM];

macro_rules! complex_reduction {
    ($type:ident, $class:literal, $doc:literal, $kernel:expr) => {
        #[doc = $doc]
        pub struct $type {
            parameters: ParameterMap,
            threads: usize,
            input: BufferFormat,
            output: BufferFormat,
        }

        impl Default for $type {
            fn default() -> Self {
                Self {
                    parameters: defaults(&PARAMETERS),
                    threads: 0,
                    input: BufferFormat::placeholder(FormatId::Complex),
                    output: BufferFormat::placeholder(FormatId::Real),
                }
            }
        }

        impl Transform for $type {
            fn name(&self) -> &'static str {
                $class
            }

            fn description(&self) -> &'static str {
                $doc
            }

            fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
                &PARAMETERS
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
                self.output = BufferFormat::new(
                    FormatId::Real,
                    format.size(),
                    format.sampling_rate(),
                )?;
                Ok(buffers_count)
            }

            fn process(
                &self,
                input: &BufferView<'_>,
                output: &mut BufferViewMut<'_>,
            ) -> SfeResult<()> {
                let input = *input;
                let kernel: fn(f32, f32) -> f32 = $kernel;
                for_each_row(self.threads, output, |i, row| {
                    for (dst, pair) in row.iter_mut().zip(input.real(i).chunks_exact(2)) {
                        *dst = kernel(pair[0], pair[1]);
                    }
                });
                Ok(())
            }
        }
    };
}

complex_reduction!(
    ComplexMagnitude,
    "ComplexMagnitude",
    "Computes the magnitude of each complex bin.",
    |re, im| (re * re + im * im).sqrt()
);

complex_reduction!(
    SpectralEnergy,
    "SpectralEnergy",
    "Computes the squared magnitude of each complex bin.",
    |re, im| re * re + im * im
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    #[test]
    fn magnitude_of_known_pairs() {
        let mut tfm = ComplexMagnitude::default();
        let fmt = BufferFormat::new(FormatId::Complex, 2, 16000).unwrap();
        let out = run_real(&mut tfm, fmt, &[vec![3.0, 4.0, 0.0, -2.0]]);
        assert_eq!(out[0], vec![5.0, 2.0]);
    }

    #[test]
    fn energy_is_the_squared_magnitude() {
        let mut tfm = SpectralEnergy::default();
        let fmt = BufferFormat::new(FormatId::Complex, 2, 16000).unwrap();
        let out = run_real(&mut tfm, fmt, &[vec![3.0, 4.0, 1.0, 1.0]]);
        assert_eq!(out[0], vec![25.0, 2.0]);
    }

    #[test]
    fn output_keeps_the_bin_count() {
        let mut tfm = SpectralEnergy::default();
        let fmt = BufferFormat::new(FormatId::Complex, 257, 22050).unwrap();
        tfm.set_input_format(&fmt, 4).unwrap();
        assert_eq!(tfm.output_format().size(), 257);
        assert_eq!(tfm.output_format().sampling_rate(), 22050);
        assert_eq!(tfm.output_format().id(), FormatId::Real);
    }
}
