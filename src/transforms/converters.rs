//! Format converters.
//!
//! Converters are ordinary transforms whose class name is the canonical
//! `"<src> -> <dst>"` string; the tree builder synthesizes that name and
//! interposes the converter whenever a child's input format does not match
//! its parent's output format.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::SfeResult;
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{ParameterDescriptor, ParameterMap};
use crate::transform::Transform;

/// Builds the canonical converter class name for a format pair.
pub fn converter_name(from: FormatId, to: FormatId) -> String {
    format!("{} -> {}", from.as_str(), to.as_str())
}

macro_rules! converter_boilerplate {
    () => {
        fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
            &[]
        }

        fn parameters(&self) -> &ParameterMap {
            static EMPTY: once_cell::sync::Lazy<ParameterMap> =
                once_cell::sync::Lazy::new(ParameterMap::new);
            &EMPTY
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
    };
}

/// Widens raw 16-bit PCM samples to floats.
pub struct Int16ToFloat {
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for Int16ToFloat {
    fn default() -> Self {
        Self {
            input: BufferFormat::placeholder(FormatId::Int16),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

impl Transform for Int16ToFloat {
    fn name(&self) -> &'static str {
        "ArrayInt16 -> ArrayRealFloat"
    }

    fn description(&self) -> &'static str {
        "Converts 16-bit integer samples to 32-bit floats."
    }

    converter_boilerplate!();

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.input = *format;
        self.output = BufferFormat::placeholder(FormatId::Real);
        self.output.set_size(format.size());
        self.output.copy_source_details_from(format);
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        for i in 0..input.count() {
            let src = input.int16(i);
            let dst = output.real_mut(i);
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s as f32;
            }
        }
        Ok(())
    }
}

/// Narrows floats back to 16-bit PCM with saturation.
pub struct FloatToInt16 {
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for FloatToInt16 {
    fn default() -> Self {
        Self {
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Int16),
        }
    }
}

impl Transform for FloatToInt16 {
    fn name(&self) -> &'static str {
        "ArrayRealFloat -> ArrayInt16"
    }

    fn description(&self) -> &'static str {
        "Converts 32-bit float samples to 16-bit integers with saturation."
    }

    converter_boilerplate!();

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.input = *format;
        self.output = BufferFormat::placeholder(FormatId::Int16);
        self.output.set_size(format.size());
        self.output.copy_source_details_from(format);
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        for i in 0..input.count() {
            let src = input.real(i);
            let dst = output.int16_mut(i);
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            }
        }
        Ok(())
    }
}

/// Reinterprets per-buffer scalars as one-element float arrays.
pub struct SingleToReal {
    input: BufferFormat,
    output: BufferFormat,
}

impl Default for SingleToReal {
    fn default() -> Self {
        Self {
            input: BufferFormat::placeholder(FormatId::Single),
            output: BufferFormat::placeholder(FormatId::Real),
        }
    }
}

impl Transform for SingleToReal {
    fn name(&self) -> &'static str {
        "Single -> ArrayRealFloat"
    }

    fn description(&self) -> &'static str {
        "Reinterprets per-buffer scalars as one-element arrays."
    }

    converter_boilerplate!();

    fn set_input_format(
        &mut self,
        format: &BufferFormat,
        buffers_count: usize,
    ) -> SfeResult<usize> {
        self.input = *format;
        self.output = BufferFormat::placeholder(FormatId::Real);
        self.output.set_size(1);
        self.output.copy_source_details_from(format);
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        for i in 0..input.count() {
            output.real_mut(i)[0] = input.real(i)[0];
        }
        Ok(())
    }
}
