//! Forward and inverse discrete cosine transform.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::kernels::dct::DctPlan;
use crate::parameters::{defaults, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static PARAMETERS: [ParameterDescriptor; 1] = [THREADS_NUM];

macro_rules! dct_transform {
    ($type:ident, $class:literal, $doc:literal, $method:ident) => {
        #[doc = $doc]
        pub struct $type {
            parameters: ParameterMap,
            threads: usize,
            input: BufferFormat,
            output: BufferFormat,
            plan: Option<DctPlan>,
        }

        impl Default for $type {
            fn default() -> Self {
                Self {
                    parameters: defaults(&PARAMETERS),
                    threads: 0,
                    input: BufferFormat::placeholder(FormatId::Real),
                    output: BufferFormat::placeholder(FormatId::Real),
                    plan: None,
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
                self.output = *format;
                Ok(buffers_count)
            }

            fn initialize(&mut self) -> SfeResult<()> {
                self.plan = Some(DctPlan::new(self.input.size()));
                Ok(())
            }

            fn process(
                &self,
                input: &BufferView<'_>,
                output: &mut BufferViewMut<'_>,
            ) -> SfeResult<()> {
                let plan = self.plan.as_ref().ok_or(SfeError::TreeNotFrozen)?;
                let input = *input;
                for_each_row(self.threads, output, |i, row| {
                    plan.$method(input.real(i), row);
                });
                Ok(())
            }
        }
    };
}

dct_transform!(Dct, "DCT", "Applies the type-II discrete cosine transform.", dct2);
dct_transform!(
    Idct,
    "IDCT",
    "Applies the type-III discrete cosine transform, inverting DCT.",
    dct3
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    #[test]
    fn preserves_the_format() {
        let mut tfm = Dct::default();
        let fmt = BufferFormat::new(FormatId::Real, 40, 16000).unwrap();
        assert_eq!(tfm.set_input_format(&fmt, 5).unwrap(), 5);
        assert_eq!(tfm.output_format().size(), 40);
        assert_eq!(tfm.output_format().id(), FormatId::Real);
    }

    #[test]
    fn forward_then_inverse_restores_the_signal() {
        let n = 40;
        let signal: Vec<f32> = (0..n).map(|i| ((i * 7) % 13) as f32 - 6.0).collect();
        let fmt = BufferFormat::new(FormatId::Real, n, 16000).unwrap();

        let mut forward = Dct::default();
        let coeffs = run_real(&mut forward, fmt, &[signal.clone()]);
        let mut inverse = Idct::default();
        let restored = run_real(&mut inverse, fmt, &coeffs);
        for (a, b) in signal.iter().zip(&restored[0]) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }
}
