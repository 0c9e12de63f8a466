//! Element-wise logarithm and square.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{
    defaults, parse_bool, parse_enum, parse_float, parse_size, ParameterDescriptor, ParameterMap,
};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogBase {
    E,
    Two,
    Ten,
}

const BASE_CHOICES: [(&str, LogBase); 3] = [("e", LogBase::E), ("2", LogBase::Two), ("10", LogBase::Ten)];

static LOG_PARAMETERS: [ParameterDescriptor; 4] = [
    ParameterDescriptor {
        name: "base",
        description: "The logarithm base: \"e\", \"2\" or \"10\".",
        default: "e",
    },
    ParameterDescriptor {
        name: "add1",
        description: "Add 1 before taking the logarithm.",
        default: "true",
    },
    ParameterDescriptor {
        name: "scale",
        description: "The value to multiply each element with beforehand.",
        default: "1",
    },
    THREADS_NUM,
];

/// `log(x * scale + add1)` applied to every element.
pub struct Log {
    parameters: ParameterMap,
    base: LogBase,
    add1: bool,
    scale: f32,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            parameters: defaults(&LOG_PARAMETERS),
            base: LogBase::E,
            add1: true,
            scale: 1.0,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

impl Log {
    fn apply(&self, row: &mut [f32]) {
        let offset = if self.add1 { 1.0 } else { 0.0 };
        for value in row.iter_mut() {
            let x = *value * self.scale + offset;
            *value = match self.base {
                LogBase::E => x.ln(),
                LogBase::Two => x.log2(),
                LogBase::Ten => x.log10(),
            };
        }
    }
}

impl Transform for Log {
    fn name(&self) -> &'static str {
        "Log"
    }

    fn description(&self) -> &'static str {
        "Takes the logarithm of each element."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &LOG_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "base" => self.base = parse_enum(self.name(), name, value, &BASE_CHOICES)?,
            "add1" => self.add1 = parse_bool(self.name(), name, value)?,
            "scale" => {
                let parsed = parse_float(self.name(), name, value)?;
                if parsed <= 0.0 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.scale = parsed;
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
        self.output = *format;
        Ok(buffers_count)
    }

    fn buffer_invariant(&self) -> bool {
        true
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        for_each_row(self.threads, output, |i, row| {
            row.copy_from_slice(input.real(i));
            self.apply(row);
        });
        Ok(())
    }

    fn process_in_place(&self, io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        for_each_row(self.threads, io, |_, row| self.apply(row));
        Ok(())
    }
}

static SQUARE_PARAMETERS: [ParameterDescriptor; 1] = [THREADS_NUM];

/// `x * x` applied to every element.
pub struct Square {
    parameters: ParameterMap,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Square {
    fn default() -> Self {
        Self {
            parameters: defaults(&SQUARE_PARAMETERS),
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

impl Transform for Square {
    fn name(&self) -> &'static str {
        "Square"
    }

    fn description(&self) -> &'static str {
        "Squares each element."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &SQUARE_PARAMETERS
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

    fn buffer_invariant(&self) -> bool {
        true
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        for_each_row(self.threads, output, |i, row| {
            for (dst, &src) in row.iter_mut().zip(input.real(i)) {
                *dst = src * src;
            }
        });
        Ok(())
    }

    fn process_in_place(&self, io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        for_each_row(self.threads, io, |_, row| {
            for value in row.iter_mut() {
                *value *= *value;
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    #[test]
    fn natural_log_with_add1() {
        let mut tfm = Log::default();
        let fmt = BufferFormat::new(FormatId::Real, 3, 16000).unwrap();
        let out = run_real(&mut tfm, fmt, &[vec![0.0, std::f32::consts::E - 1.0, 1.0]]);
        assert!((out[0][0]).abs() < 1e-6);
        assert!((out[0][1] - 1.0).abs() < 1e-6);
        assert!((out[0][2] - 2.0f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn base_and_scale_are_honored() {
        let mut tfm = Log::default();
        tfm.set_parameter("base", "10").unwrap();
        tfm.set_parameter("add1", "false").unwrap();
        tfm.set_parameter("scale", "100").unwrap();
        let fmt = BufferFormat::new(FormatId::Real, 1, 16000).unwrap();
        let out = run_real(&mut tfm, fmt, &[vec![1.0]]);
        assert!((out[0][0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_base_is_rejected() {
        let mut tfm = Log::default();
        assert!(tfm.set_parameter("base", "7").is_err());
        assert!(tfm.set_parameter("scale", "-1").is_err());
    }

    #[test]
    fn square_squares() {
        let mut tfm = Square::default();
        let fmt = BufferFormat::new(FormatId::Real, 3, 16000).unwrap();
        let out = run_real(&mut tfm, fmt, &[vec![-2.0, 0.5, 3.0]]);
        assert_eq!(out[0], vec![4.0, 0.25, 9.0]);
    }
}
