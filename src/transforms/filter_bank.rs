//! Triangular filter bank on a psychoacoustic scale.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::kernels::scales::{linear_to_scale, scale_to_linear, Scale, SCALE_CHOICES};
use crate::parameters::{
    defaults, parse_bool, parse_enum, parse_float, parse_size, ParameterDescriptor, ParameterMap,
};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static PARAMETERS: [ParameterDescriptor; 6] = [
    ParameterDescriptor {
        name: "number",
        description: "The number of triangular filters.",
        default: "40",
    },
    ParameterDescriptor {
        name: "type",
        description: "The scale: \"linear\", \"mel\", \"bark\" or \"midi\".",
        default: "mel",
    },
    ParameterDescriptor {
        name: "frequency_min",
        description: "Minimal frequency of the filter bank in Hz.",
        default: "130",
    },
    ParameterDescriptor {
        name: "frequency_max",
        description: "Maximal frequency of the filter bank in Hz.",
        default: "6854",
    },
    ParameterDescriptor {
        name: "squared",
        description: "Use squared triangles.",
        default: "false",
    },
    THREADS_NUM,
];

struct Filter {
    start: usize,
    weights: Vec<f32>,
}

/// Converts the spectrum to the selected psychoacoustic scale: each of the
/// `number` output values is the input weighted by one triangular filter,
/// the triangles being uniform in scale space and curvy in frequency space.
pub struct FilterBank {
    parameters: ParameterMap,
    number: usize,
    scale: Scale,
    frequency_min: f32,
    frequency_max: f32,
    squared: bool,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    filters: Vec<Filter>,
}

impl Default for FilterBank {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            number: 40,
            scale: Scale::Mel,
            frequency_min: 130.0,
            frequency_max: 6854.0,
            squared: false,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            filters: Vec::new(),
        }
    }
}

impl FilterBank {
    fn invalid(&self, name: &str, value: &str) -> SfeError {
        SfeError::InvalidValue {
            class: "FilterBank".to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// One triangular filter centered at `center` (scale units) with the
    /// given half width, sampled over the `bins`-point spectrum.
    fn build_filter(&self, center: f32, half_width: f32, bins: usize, df: f32) -> Filter {
        let left = scale_to_linear(self.scale, center - half_width);
        let right = scale_to_linear(self.scale, center + half_width);
        let start = ((left / df).ceil().max(0.0) as usize).min(bins);
        let stop = (((right / df).ceil()).max(0.0) as usize).min(bins);
        let mut weights = Vec::with_capacity(stop.saturating_sub(start));
        for i in start..stop {
            let position = linear_to_scale(self.scale, i as f32 * df);
            let ratio = if position <= center {
                (position - center + half_width) / half_width
            } else {
                1.0 - (position - center) / half_width
            };
            let clamped = ratio.clamp(0.0, 1.0);
            weights.push(if self.squared { clamped * clamped } else { clamped });
        }
        Filter { start, weights }
    }
}

impl Transform for FilterBank {
    fn name(&self) -> &'static str {
        "FilterBank"
    }

    fn description(&self) -> &'static str {
        "Converts the signal to the selected psychoacoustic scale (default is mel)."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "number" => {
                let parsed = parse_size(self.name(), name, value)?;
                if parsed == 0 || parsed > 2048 {
                    return Err(self.invalid(name, value));
                }
                self.number = parsed;
            }
            "type" => self.scale = parse_enum(self.name(), name, value, &SCALE_CHOICES)?,
            "frequency_min" => {
                let parsed = parse_float(self.name(), name, value)?;
                if parsed < 1.0 || parsed >= self.frequency_max {
                    return Err(self.invalid(name, value));
                }
                self.frequency_min = parsed;
            }
            "frequency_max" => {
                let parsed = parse_float(self.name(), name, value)?;
                if parsed <= self.frequency_min {
                    return Err(self.invalid(name, value));
                }
                self.frequency_max = parsed;
            }
            "squared" => self.squared = parse_bool(self.name(), name, value)?,
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
        self.output =
            BufferFormat::new(FormatId::Real, self.number, format.sampling_rate())?;
        Ok(buffers_count)
    }

    fn initialize(&mut self) -> SfeResult<()> {
        let bins = self.input.size();
        let nyquist = self.input.sampling_rate() as f32 / 2.0;
        if self.frequency_max > nyquist {
            log::warn!(
                "filter bank reaches {} Hz above the Nyquist frequency {} Hz",
                self.frequency_max,
                nyquist
            );
        }
        // Frequency resolution of the bins: the spectrum spans 0..Nyquist
        // over `bins` points.
        let df = nyquist / bins.max(1) as f32;
        let scale_min = linear_to_scale(self.scale, self.frequency_min);
        let scale_max = linear_to_scale(self.scale, self.frequency_max);
        let dsc = (scale_max - scale_min) / (self.number.max(2) - 1) as f32;
        self.filters = (0..self.number)
            .map(|i| self.build_filter(scale_min + dsc * i as f32, dsc, bins, df))
            .collect();
        Ok(())
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let input = *input;
        let filters = &self.filters;
        for_each_row(self.threads, output, |i, row| {
            let spectrum = input.real(i);
            for (dst, filter) in row.iter_mut().zip(filters) {
                *dst = filter
                    .weights
                    .iter()
                    .zip(&spectrum[filter.start..])
                    .map(|(w, x)| w * x)
                    .sum();
            }
        });
        Ok(())
    }
}
