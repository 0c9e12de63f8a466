//! Per-window scalar descriptors: energy and zero crossings.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{defaults, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static PARAMETERS: [ParameterDescriptor; 1] = [THREADS_NUM];

macro_rules! scalar_descriptor {
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
                    input: BufferFormat::placeholder(FormatId::Real),
                    output: BufferFormat::placeholder(FormatId::Single),
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
                self.output =
                    BufferFormat::new(FormatId::Single, 1, format.sampling_rate())?;
                Ok(buffers_count)
            }

            fn process(
                &self,
                input: &BufferView<'_>,
                output: &mut BufferViewMut<'_>,
            ) -> SfeResult<()> {
                let input = *input;
                let kernel: fn(&[f32]) -> f32 = $kernel;
                for_each_row(self.threads, output, |i, row| {
                    row[0] = kernel(input.real(i));
                });
                Ok(())
            }
        }
    };
}

scalar_descriptor!(
    Energy,
    "Energy",
    "Computes the mean square of each buffer.",
    |window| {
        let sum: f32 = window.iter().map(|x| x * x).sum();
        sum / window.len().max(1) as f32
    }
);

scalar_descriptor!(
    ZeroCrossings,
    "ZeroCrossings",
    "Counts the sign changes inside each buffer.",
    |window| {
        window
            .windows(2)
            .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
            .count() as f32
    }
);
