//! Differentiation: within a buffer and across the buffer series.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{
    defaults, parse_bool, parse_enum, parse_size, ParameterDescriptor, ParameterMap,
};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static DIFF_PARAMETERS: [ParameterDescriptor; 2] = [
    ParameterDescriptor {
        name: "rectify",
        description: "Keep only the positive differences.",
        default: "false",
    },
    THREADS_NUM,
];

/// First difference inside each buffer: `out[i] = in[i] - in[i - 1]`,
/// `out[0] = 0`.
pub struct Diff {
    parameters: ParameterMap,
    rectify: bool,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Diff {
    fn default() -> Self {
        Self {
            parameters: defaults(&DIFF_PARAMETERS),
            rectify: false,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

fn differentiate(rectify: bool, row: &mut [f32]) {
    // Backward pass keeps the in-place variant correct.
    for i in (1..row.len()).rev() {
        let d = row[i] - row[i - 1];
        row[i] = if rectify { d.max(0.0) } else { d };
    }
    if !row.is_empty() {
        row[0] = 0.0;
    }
}

impl Transform for Diff {
    fn name(&self) -> &'static str {
        "Diff"
    }

    fn description(&self) -> &'static str {
        "Differentiates each buffer."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &DIFF_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "rectify" => self.rectify = parse_bool(self.name(), name, value)?,
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
        let rectify = self.rectify;
        for_each_row(self.threads, output, |i, row| {
            row.copy_from_slice(input.real(i));
            differentiate(rectify, row);
        });
        Ok(())
    }

    fn process_in_place(&self, io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let rectify = self.rectify;
        for_each_row(self.threads, io, |_, row| differentiate(rectify, row));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeltaType {
    Simple,
    Regression,
}

const DELTA_CHOICES: [(&str, DeltaType); 2] = [
    ("simple", DeltaType::Simple),
    ("regression", DeltaType::Regression),
];

static DELTA_PARAMETERS: [ParameterDescriptor; 2] = [
    ParameterDescriptor {
        name: "type",
        description: "The algorithm: \"simple\" or \"regression\".",
        default: "regression",
    },
    ParameterDescriptor {
        name: "rlength",
        description: "The odd regression window length in buffers.",
        default: "5",
    },
];

/// Differentiates the buffer series: each output buffer is the delta of
/// its input buffer against the neighbors.
///
/// `simple` is the first difference between adjacent buffers. `regression`
/// fits the slope over a window of `rlength` buffers; it is experimental
/// and should be cross-checked against the simple variant.
pub struct Delta {
    parameters: ParameterMap,
    kind: DeltaType,
    rlength: usize,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Delta {
    fn default() -> Self {
        Self {
            parameters: defaults(&DELTA_PARAMETERS),
            kind: DeltaType::Regression,
            rlength: 5,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

impl Transform for Delta {
    fn name(&self) -> &'static str {
        "Delta"
    }

    fn description(&self) -> &'static str {
        "Differentiates the buffer series."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &DELTA_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "type" => self.kind = parse_enum(self.name(), name, value, &DELTA_CHOICES)?,
            "rlength" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed < 3 || parsed % 2 == 0 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.rlength = parsed;
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
        let count = input.count();
        match self.kind {
            DeltaType::Simple => {
                for i in 0..count {
                    let row = output.real_mut(i);
                    if i == 0 {
                        row.fill(0.0);
                    } else {
                        for ((dst, &a), &b) in
                            row.iter_mut().zip(input.real(i)).zip(input.real(i - 1))
                        {
                            *dst = a - b;
                        }
                    }
                }
            }
            DeltaType::Regression => {
                let reach = (self.rlength - 1) / 2;
                let norm: f32 = 2.0 * (1..=reach).map(|n| (n * n) as f32).sum::<f32>();
                for i in 0..count {
                    let row = output.real_mut(i);
                    for (j, slot) in row.iter_mut().enumerate() {
                        let mut acc = 0.0f32;
                        for n in 1..=reach {
                            // Clamp the window at the series edges.
                            let ahead = (i + n).min(count - 1);
                            let behind = i.saturating_sub(n);
                            acc += n as f32 * (input.real(ahead)[j] - input.real(behind)[j]);
                        }
                        *slot = acc / norm;
                    }
                }
            }
        }
        Ok(())
    }
}
