//! Element selection with zero padding.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{defaults, parse_enum, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Left,
    Right,
}

const ANCHOR_CHOICES: [(&str, Anchor); 2] = [("left", Anchor::Left), ("right", Anchor::Right)];

static PARAMETERS: [ParameterDescriptor; 4] = [
    ParameterDescriptor {
        name: "length",
        description: "The output buffer length; 0 keeps the input length.",
        default: "0",
    },
    ParameterDescriptor {
        name: "select",
        description: "The number of elements to copy; 0 copies \"length\" elements.",
        default: "0",
    },
    ParameterDescriptor {
        name: "from",
        description: "The anchor to select from: \"left\" or \"right\".",
        default: "left",
    },
    THREADS_NUM,
];

/// Copies `select` elements from the chosen end of each buffer into an
/// output of `length` elements, zero-filling the remainder.
pub struct Selector {
    parameters: ParameterMap,
    length: usize,
    select: usize,
    from: Anchor,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    effective_length: usize,
    effective_select: usize,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            length: 0,
            select: 0,
            from: Anchor::Left,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            effective_length: 0,
            effective_select: 0,
        }
    }
}

impl Transform for Selector {
    fn name(&self) -> &'static str {
        "Selector"
    }

    fn description(&self) -> &'static str {
        "Selects the specified part of each buffer, zero-padding the rest."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "length" => self.length = parse_size(self.name(), name, value)?,
            "select" => self.select = parse_size(self.name(), name, value)?,
            "from" => self.from = parse_enum(self.name(), name, value, &ANCHOR_CHOICES)?,
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
        self.effective_length = if self.length == 0 {
            format.size()
        } else {
            self.length
        };
        self.effective_select = if self.select == 0 {
            self.effective_length
        } else {
            self.select
        };
        if self.effective_select > format.size() || self.effective_select > self.effective_length {
            return Err(SfeError::InvalidValue {
                class: self.name().to_string(),
                name: "select".to_string(),
                value: self.effective_select.to_string(),
            });
        }
        self.output = *format;
        self.output.set_size(self.effective_length);
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        let select = self.effective_select;
        let length = self.effective_length;
        let from = self.from;
        for_each_row(self.threads, output, |i, row| {
            let src = input.real(i);
            match from {
                Anchor::Left => {
                    row[..select].copy_from_slice(&src[..select]);
                    row[select..].fill(0.0);
                }
                Anchor::Right => {
                    row[length - select..].copy_from_slice(&src[src.len() - select..]);
                    row[..length - select].fill(0.0);
                }
            }
        });
        Ok(())
    }
}
