//! Short-time mean and scale normalization.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{defaults, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::Transform;

static PARAMETERS: [ParameterDescriptor; 1] = [ParameterDescriptor {
    name: "length",
    description: "The amount of local values to average.",
    default: "25",
}];

/// Normalizes every coefficient by the mean and value range of its local
/// neighborhood across buffers:
/// `out[i][j] = (in[i][j] - mean_k(in[k][j])) / (max_k - min_k)` where `k`
/// spans the `length` buffers around `i`.
pub struct Stmsn {
    parameters: ParameterMap,
    length: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Stmsn {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            length: 25,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

impl Transform for Stmsn {
    fn name(&self) -> &'static str {
        "STMSN"
    }

    fn description(&self) -> &'static str {
        "Calculates short-time mean and scale normalized values."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "length" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed < 2 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.length = parsed;
            }
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

    fn slice_safe(&self) -> bool {
        false
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let count = input.count() as isize;
        let back = (self.length / 2) as isize;
        let front = (self.length - self.length / 2) as isize;
        for i in 0..input.count() {
            let this = input.real(i);
            let row = output.real_mut(i);
            let start = (i as isize - back).max(0) as usize;
            let stop = (i as isize + front).min(count) as usize;
            let len = (stop - start) as f32;
            for (j, slot) in row.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                let mut min = this[j];
                let mut max = this[j];
                for k in start..stop {
                    let value = input.real(k)[j];
                    sum += value;
                    if value < min {
                        min = value;
                    } else if value > max {
                        max = value;
                    }
                }
                *slot = if max - min > 0.0 {
                    (this[j] - sum / len) / (max - min)
                } else {
                    0.0
                };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    #[test]
    fn constant_coefficients_normalize_to_zero() {
        let mut tfm = Stmsn::default();
        tfm.set_parameter("length", "4").unwrap();
        let fmt = BufferFormat::new(FormatId::Real, 2, 16000).unwrap();
        let inputs: Vec<Vec<f32>> = (0..6).map(|_| vec![3.0, -1.0]).collect();
        let out = run_real(&mut tfm, fmt, &inputs);
        for row in &out {
            assert_eq!(row, &vec![0.0, 0.0]);
        }
    }

    #[test]
    fn normalized_values_are_bounded_by_one() {
        let mut tfm = Stmsn::default();
        tfm.set_parameter("length", "4").unwrap();
        let fmt = BufferFormat::new(FormatId::Real, 1, 16000).unwrap();
        let inputs: Vec<Vec<f32>> = (0..10).map(|i| vec![(i * i) as f32]).collect();
        let out = run_real(&mut tfm, fmt, &inputs);
        for row in &out {
            assert!(row[0].abs() <= 1.0);
        }
    }

    #[test]
    fn too_short_length_is_rejected() {
        let mut tfm = Stmsn::default();
        assert!(tfm.set_parameter("length", "1").is_err());
    }
}
