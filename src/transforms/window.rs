//! Window splitting and the inverse overlap reassembly.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::kernels::window_fn::{self, WindowType, WINDOW_CHOICES};
use crate::parameters::{defaults, parse_enum, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static WINDOW_PARAMETERS: [ParameterDescriptor; 4] = [
    ParameterDescriptor {
        name: "length",
        description: "Window size in samples.",
        default: "512",
    },
    ParameterDescriptor {
        name: "step",
        description: "Distance between sequential windows in samples.",
        default: "205",
    },
    ParameterDescriptor {
        name: "type",
        description: "Type of the window, e.g. \"rectangular\" or \"hamming\".",
        default: "hamming",
    },
    THREADS_NUM,
];

/// Splits each input buffer into overlapping windows, applying the window
/// function unless it is rectangular. One input of `N` samples becomes
/// `(N - length) / step + 1` buffers of `length` samples.
pub struct Window {
    parameters: ParameterMap,
    length: usize,
    step: usize,
    kind: WindowType,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    windows_count: usize,
    coefficients: Vec<f32>,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            parameters: defaults(&WINDOW_PARAMETERS),
            length: 512,
            step: 205,
            kind: WindowType::Hamming,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            windows_count: 0,
            coefficients: Vec::new(),
        }
    }
}

impl Transform for Window {
    fn name(&self) -> &'static str {
        "Window"
    }

    fn description(&self) -> &'static str {
        "Splits the input signal into overlapping windows."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &WINDOW_PARAMETERS
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
            "step" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed < 1 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.step = parsed;
            }
            "type" => self.kind = parse_enum(self.name(), name, value, &WINDOW_CHOICES)?,
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
        if format.size() < self.length {
            return Err(SfeError::InvalidValue {
                class: self.name().to_string(),
                name: "length".to_string(),
                value: self.length.to_string(),
            });
        }
        self.input = *format;
        self.output = *format;
        self.output.set_size(self.length);
        self.windows_count = (format.size() - self.length) / self.step + 1;
        let excess = (format.size() - self.length) % self.step;
        if excess != 0 {
            log::warn!(
                "(input size {} - window length {}) is not divisible by step {}; \
                 {} trailing samples will not be processed",
                format.size(),
                self.length,
                self.step,
                excess
            );
        }
        Ok(self.windows_count * buffers_count)
    }

    fn initialize(&mut self) -> SfeResult<()> {
        self.coefficients = window_fn::coefficients(self.kind, self.length);
        Ok(())
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        let windows = self.windows_count;
        let step = self.step;
        let rectangular = self.kind == WindowType::Rectangular;
        let coefficients = &self.coefficients;
        for_each_row(self.threads, output, |o, row| {
            let source = input.real(o / windows);
            let offset = (o % windows) * step;
            let slice = &source[offset..offset + row.len()];
            if rectangular {
                row.copy_from_slice(slice);
            } else {
                for ((dst, &src), &w) in row.iter_mut().zip(slice).zip(coefficients) {
                    *dst = src * w;
                }
            }
        });
        Ok(())
    }
}

static MERGE_PARAMETERS: [ParameterDescriptor; 2] = [
    ParameterDescriptor {
        name: "step",
        description: "Distance between sequential windows in samples.",
        default: "205",
    },
    ParameterDescriptor {
        name: "count",
        description: "The resulting amount of buffers.",
        default: "1",
    },
];

/// Reassembles overlapping windows back into continuous buffers, the
/// inverse of [`Window`]. Each group of `input_count / count` windows
/// contributes its center `step` samples, except the first and the last
/// which keep their outer halves.
pub struct WindowMerge {
    parameters: ParameterMap,
    step: usize,
    count: usize,
    input: BufferFormat,
    output: BufferFormat,
    windows_count: usize,
}

impl Default for WindowMerge {
    fn default() -> Self {
        Self {
            parameters: defaults(&MERGE_PARAMETERS),
            step: 205,
            count: 1,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            windows_count: 0,
        }
    }
}

impl Transform for WindowMerge {
    fn name(&self) -> &'static str {
        "WindowMerge"
    }

    fn description(&self) -> &'static str {
        "Merges overlapping windows back into a continuous signal."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &MERGE_PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "step" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed < 1 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.step = parsed;
            }
            "count" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed < 1 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.count = parsed;
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
        self.windows_count = (buffers_count / self.count).max(1);
        self.output = *format;
        self.output
            .set_size(format.size() + (self.windows_count - 1) * self.step);
        Ok(self.count)
    }

    fn slice_safe(&self) -> bool {
        false
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let window = self.input.size();
        let offset = (window - self.step) / 2;
        for i in 0..input.count() {
            let out_index = i / self.windows_count;
            let window_index = i % self.windows_count;
            let src = input.real(i);
            let dst = output.real_mut(out_index);
            if window_index == 0 {
                dst[..window - offset].copy_from_slice(&src[..window - offset]);
            } else {
                let at = window - offset + self.step * (window_index - 1);
                if window_index < self.windows_count - 1 {
                    dst[at..at + self.step].copy_from_slice(&src[offset..offset + self.step]);
                } else {
                    dst[at..at + window - offset].copy_from_slice(&src[offset..]);
                }
            }
        }
        Ok(())
    }
}
