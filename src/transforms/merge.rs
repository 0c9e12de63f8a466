//! Buffer list concatenation.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{ParameterDescriptor, ParameterMap};
use crate::transform::Transform;

/// Concatenates the whole buffer list into one buffer: `k` buffers of `S`
/// elements become a single buffer of `k * S` elements.
pub struct Merge {
    parameters: ParameterMap,
    input: BufferFormat,
    output: BufferFormat,
    input_count: usize,
}

impl Default for Merge {
    fn default() -> Self {
        Self {
            parameters: ParameterMap::new(),
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            input_count: 0,
        }
    }
}

impl Transform for Merge {
    fn name(&self) -> &'static str {
        "Merge"
    }

    fn description(&self) -> &'static str {
        "Concatenates all buffers into one."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &[]
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
        self.input_count = buffers_count.max(1);
        self.output =
            BufferFormat::new(FormatId::Real, format.size() * self.input_count, format.sampling_rate())?;
        Ok(1)
    }

    fn slice_safe(&self) -> bool {
        false
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let size = self.input.size();
        let row = output.real_mut(0);
        for i in 0..input.count() {
            row[i * size..(i + 1) * size].copy_from_slice(input.real(i));
        }
        Ok(())
    }
}
