//! The pass-through transform.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::SfeResult;
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{ParameterDescriptor, ParameterMap};
use crate::transform::Transform;

/// Copies its input to its output unchanged. Registered under the
/// `Identity` format id, which equals every other format, so it can appear
/// anywhere in a recipe without triggering converter insertion.
pub struct Identity {
    parameters: ParameterMap,
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            parameters: ParameterMap::new(),
            input: BufferFormat::placeholder(FormatId::Identity),
            output: BufferFormat::placeholder(FormatId::Identity),
        }
    }
}

impl Transform for Identity {
    fn name(&self) -> &'static str {
        "Identity"
    }

    fn description(&self) -> &'static str {
        "Passes the input buffers through unchanged."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &[]
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, _value: &str) -> SfeResult<()> {
        Err(crate::error::SfeError::UnknownParameter {
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
        self.output = *format;
        Ok(buffers_count)
    }

    fn buffer_invariant(&self) -> bool {
        true
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        for i in 0..input.count() {
            output.bytes_mut(i).copy_from_slice(input.bytes(i));
        }
        Ok(())
    }

    fn process_in_place(&self, _io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        Ok(())
    }
}
