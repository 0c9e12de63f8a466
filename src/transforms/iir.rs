//! Second-order IIR filtering of each buffer.

use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Q_BUTTERWORTH_F32};

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::parameters::{
    defaults, parse_enum, parse_float, parse_size, ParameterDescriptor, ParameterMap,
};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

const KIND_CHOICES: [(&str, FilterKind); 4] = [
    ("lowpass", FilterKind::Lowpass),
    ("highpass", FilterKind::Highpass),
    ("bandpass", FilterKind::Bandpass),
    ("bandstop", FilterKind::Bandstop),
];

static PARAMETERS: [ParameterDescriptor; 4] = [
    ParameterDescriptor {
        name: "type",
        description: "The filter type: \"lowpass\", \"highpass\", \"bandpass\" or \"bandstop\".",
        default: "lowpass",
    },
    ParameterDescriptor {
        name: "frequency",
        description: "The cutoff or center frequency in Hz.",
        default: "4000",
    },
    ParameterDescriptor {
        name: "q",
        description: "The quality factor; 0 uses the Butterworth value.",
        default: "0",
    },
    THREADS_NUM,
];

/// Runs a biquad filter cascade over each buffer independently. The filter
/// state is per invocation, so buffers never leak into each other.
pub struct IirFilter {
    parameters: ParameterMap,
    kind: FilterKind,
    frequency: f32,
    q: f32,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    coefficients: Option<Coefficients<f32>>,
}

impl Default for IirFilter {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            kind: FilterKind::Lowpass,
            frequency: 4000.0,
            q: 0.0,
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Real),
            coefficients: None,
        }
    }
}

impl Transform for IirFilter {
    fn name(&self) -> &'static str {
        "IIRFilter"
    }

    fn description(&self) -> &'static str {
        "Filters each buffer with a second-order IIR section."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
            "type" => self.kind = parse_enum(self.name(), name, value, &KIND_CHOICES)?,
            "frequency" => {
                let parsed = parse_float(self.name(), name, value)?;
                if parsed <= 0.0 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.frequency = parsed;
            }
            "q" => {
                let parsed = parse_float(self.name(), name, value)?;
                if parsed < 0.0 {
                    return Err(SfeError::InvalidValue {
                        class: self.name().to_string(),
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                self.q = parsed;
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

    fn initialize(&mut self) -> SfeResult<()> {
        let kind = match self.kind {
            FilterKind::Lowpass => biquad::Type::LowPass,
            FilterKind::Highpass => biquad::Type::HighPass,
            FilterKind::Bandpass => biquad::Type::BandPass,
            FilterKind::Bandstop => biquad::Type::Notch,
        };
        let q = if self.q == 0.0 { Q_BUTTERWORTH_F32 } else { self.q };
        let coefficients = Coefficients::<f32>::from_params(
            kind,
            (self.input.sampling_rate() as f32).hz(),
            self.frequency.hz(),
            q,
        )
        .map_err(|_| SfeError::InvalidValue {
            class: self.name().to_string(),
            name: "frequency".to_string(),
            value: self.frequency.to_string(),
        })?;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn buffer_invariant(&self) -> bool {
        true
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let coefficients = self.coefficients.ok_or(SfeError::TreeNotFrozen)?;
        let input = *input;
        for_each_row(self.threads, output, |i, row| {
            let mut filter = DirectForm1::<f32>::new(coefficients);
            for (dst, &src) in row.iter_mut().zip(input.real(i)) {
                *dst = filter.run(src);
            }
        });
        Ok(())
    }

    fn process_in_place(&self, io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let coefficients = self.coefficients.ok_or(SfeError::TreeNotFrozen)?;
        for_each_row(self.threads, io, |_, row| {
            let mut filter = DirectForm1::<f32>::new(coefficients);
            for value in row.iter_mut() {
                *value = filter.run(*value);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    fn tone(freq: f32, rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin())
            .collect()
    }

    fn rms(values: &[f32]) -> f32 {
        (values.iter().map(|x| x * x).sum::<f32>() / values.len() as f32).sqrt()
    }

    #[test]
    fn lowpass_attenuates_high_frequencies() {
        let n = 4096;
        let mut tfm = IirFilter::default();
        tfm.set_parameter("frequency", "500").unwrap();
        let fmt = BufferFormat::new(FormatId::Real, n, 16000).unwrap();
        let low = run_real(&mut tfm, fmt, &[tone(100.0, 16000.0, n)]);

        let mut tfm = IirFilter::default();
        tfm.set_parameter("frequency", "500").unwrap();
        let high = run_real(&mut tfm, fmt, &[tone(6000.0, 16000.0, n)]);

        let settled = n / 2;
        assert!(rms(&low[0][settled..]) > 5.0 * rms(&high[0][settled..]));
    }

    #[test]
    fn invalid_cutoff_fails_at_initialize() {
        let mut tfm = IirFilter::default();
        tfm.set_parameter("frequency", "12000").unwrap();
        let fmt = BufferFormat::new(FormatId::Real, 64, 16000).unwrap();
        tfm.set_input_format(&fmt, 1).unwrap();
        // 12 kHz is above the 8 kHz Nyquist limit of a 16 kHz signal.
        assert!(tfm.initialize().is_err());
    }

    #[test]
    fn negative_q_is_rejected() {
        let mut tfm = IirFilter::default();
        assert!(tfm.set_parameter("q", "-0.5").is_err());
        assert!(tfm.set_parameter("type", "allpass").is_err());
    }
}
