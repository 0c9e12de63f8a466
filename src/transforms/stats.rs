//! Descriptive statistics over buffer contents.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::kernels::moments;
use crate::parameters::{defaults, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

/// The four statistics, in their fixed output-slot order.
const STAT_NAMES: [&str; 4] = ["average", "stddev", "skewness", "kurtosis"];

/// Width of one statistics group in the output buffer.
const GROUP_WIDTH: usize = 4;

static PARAMETERS: [ParameterDescriptor; 3] = [
    ParameterDescriptor {
        name: "types",
        description: "Whitespace-separated statistics to calculate \
                      (\"average\", \"stddev\", \"skewness\", \"kurtosis\" or \"all\").",
        default: "all",
    },
    ParameterDescriptor {
        name: "interval",
        description: "The sub-interval length; 0 treats the whole buffer as one interval.",
        default: "0",
    },
    THREADS_NUM,
];

/// Calculates mean, standard deviation, skewness and kurtosis of each
/// buffer, or of each `interval`-sized chunk of it. Every group occupies
/// four output slots in the fixed order above; statistics that were not
/// requested stay zero.
pub struct Stats {
    parameters: ParameterMap,
    selected: [bool; 4],
    interval: usize,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    groups: usize,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            selected: [true; 4],
            interval: 0,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            groups: 0,
        }
    }
}

impl Stats {
    fn write_group(&self, values: &[f32], out: &mut [f32]) {
        let m = moments::raw_moments(values);
        let all = [
            moments::mean(&m),
            moments::std_deviation(&m),
            moments::skewness(&m),
            moments::kurtosis(&m),
        ];
        for (slot, (enabled, value)) in out.iter_mut().zip(self.selected.iter().zip(all)) {
            *slot = if *enabled { value } else { 0.0 };
        }
    }
}

impl Transform for Stats {
    fn name(&self) -> &'static str {
        "Stats"
    }

    fn description(&self) -> &'static str {
        "Calculates statistics (mean, stddev, skewness, kurtosis) of the buffers."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "types" => {
                let mut selected = [false; 4];
                for word in value.split_whitespace() {
                    if word == "all" {
                        selected = [true; 4];
                        continue;
                    }
                    match STAT_NAMES.iter().position(|n| *n == word) {
                        Some(index) => selected[index] = true,
                        None => {
                            return Err(SfeError::InvalidValue {
                                class: self.name().to_string(),
                                name: name.to_string(),
                                value: value.to_string(),
                            })
                        }
                    }
                }
                if !selected.iter().any(|&s| s) {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.selected = selected;
            }
            "interval" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed == 1 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.interval = parsed;
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
        self.groups = if self.interval == 0 {
            1
        } else {
            format.size().div_ceil(self.interval)
        };
        self.output = BufferFormat::new(
            FormatId::Real,
            self.groups * GROUP_WIDTH,
            format.sampling_rate(),
        )?;
        Ok(buffers_count)
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        let interval = self.interval;
        for_each_row(self.threads, output, |i, row| {
            let values = input.real(i);
            if interval == 0 {
                self.write_group(values, &mut row[..GROUP_WIDTH]);
            } else {
                for (group, chunk) in values.chunks(interval).enumerate() {
                    let at = group * GROUP_WIDTH;
                    self.write_group(chunk, &mut row[at..at + GROUP_WIDTH]);
                }
            }
        });
        Ok(())
    }
}
