//! First-order preemphasis filter.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::SfeResult;
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{
    defaults, parse_float, parse_size, ParameterDescriptor, ParameterMap,
};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static PARAMETERS: [ParameterDescriptor; 2] = [
    ParameterDescriptor {
        name: "value",
        description: "The preemphasis coefficient.",
        default: "0.9",
    },
    THREADS_NUM,
];

/// `y[i] = x[i] - k * x[i - 1]`, boosting the high end of the spectrum
/// before windowing.
pub struct Preemphasis {
    parameters: ParameterMap,
    value: f32,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Preemphasis {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            value: 0.9,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

fn preemphasize(k: f32, row: &mut [f32]) {
    // Backward pass so the in-place variant never reads an already
    // overwritten neighbor.
    for i in (1..row.len()).rev() {
        row[i] -= k * row[i - 1];
    }
}

impl Transform for Preemphasis {
    fn name(&self) -> &'static str {
        "Preemphasis"
    }

    fn description(&self) -> &'static str {
        "Filters the signal with y[i] = x[i] - k * x[i - 1]."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "value" => {
                let parsed = parse_float(self.name(), name, value)?;
                if !(parsed > 0.0 && parsed <= 1.0) {
                    return Err(crate::error::SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.value = parsed;
            }
            "threads_num" => self.threads = parse_size(self.name(), name, value)?,
            _ => {
                return Err(crate::error::SfeError::UnknownParameter {
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
        let k = self.value;
        let input = *input;
        for_each_row(self.threads, output, |i, row| {
            row.copy_from_slice(input.real(i));
            preemphasize(k, row);
        });
        Ok(())
    }

    fn process_in_place(&self, io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let k = self.value;
        for_each_row(self.threads, io, |_, row| preemphasize(k, row));
        Ok(())
    }
}
