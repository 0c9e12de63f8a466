//! Forward and inverse real DFT.

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::kernels::fft::RealFftPlan;
use crate::parameters::{defaults, parse_size, ParameterDescriptor, ParameterMap};
use crate::transform::{for_each_row, Transform, THREADS_NUM};

static PARAMETERS: [ParameterDescriptor; 1] = [THREADS_NUM];

/// Forward real DFT: `N` real samples become `N/2 + 1` complex bins
/// (`N + 2` floats, DC through Nyquist).
pub struct Rdft {
    parameters: ParameterMap,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    plan: Option<RealFftPlan>,
}

impl Default for Rdft {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Real),
            output: BufferFormat::placeholder(FormatId::Complex),
            plan: None,
        }
    }
}

impl Transform for Rdft {
    fn name(&self) -> &'static str {
        "RDFT"
    }

    fn description(&self) -> &'static str {
        "Applies the forward discrete Fourier transform to a real signal."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
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
        self.output = BufferFormat::new(
            FormatId::Complex,
            format.size() / 2 + 1,
            format.sampling_rate(),
        )?;
        Ok(buffers_count)
    }

    fn initialize(&mut self) -> SfeResult<()> {
        self.plan = Some(RealFftPlan::new(self.input.size()));
        Ok(())
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let plan = self.plan.as_ref().ok_or(SfeError::TreeNotFrozen)?;
        let input = *input;
        for_each_row(self.threads, output, |i, row| {
            plan.rdft(input.real(i), row);
        });
        Ok(())
    }
}

/// Inverse real DFT: `M` complex bins become `2 * (M - 1)` real samples,
/// scaled by `1/N`.
pub struct Irdft {
    parameters: ParameterMap,
    threads: usize,
    input: BufferFormat,
    output: BufferFormat,
    plan: Option<RealFftPlan>,
}

impl Default for Irdft {
    fn default() -> Self {
        Self {
            parameters: defaults(&PARAMETERS),
            threads: 0,
            input: BufferFormat::placeholder(FormatId::Complex),
            output: BufferFormat::placeholder(FormatId::Real),
            plan: None,
        }
    }
}

impl Transform for Irdft {
    fn name(&self) -> &'static str {
        "IRDFT"
    }

    fn description(&self) -> &'static str {
        "Applies the inverse discrete Fourier transform, producing a real signal."
    }

    fn supported_parameters(&self) -> &'static [ParameterDescriptor] {
        &PARAMETERS
    }

    fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()> {
        match name {
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
        if format.size() < 2 {
            return Err(SfeError::InvalidValue {
                class: self.name().to_string(),
                name: "input".to_string(),
                value: format.size().to_string(),
            });
        }
        self.input = *format;
        self.output = BufferFormat::new(
            FormatId::Real,
            2 * (format.size() - 1),
            format.sampling_rate(),
        )?;
        Ok(buffers_count)
    }

    fn initialize(&mut self) -> SfeResult<()> {
        self.plan = Some(RealFftPlan::new(self.output.size()));
        Ok(())
    }

    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()> {
        let plan = self.plan.as_ref().ok_or(SfeError::TreeNotFrozen)?;
        let input = *input;
        for_each_row(self.threads, output, |i, row| {
            plan.irdft(input.real(i), row);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::testing::run_real;

    #[test]
    fn output_format_gains_the_nyquist_pair() {
        let mut tfm = Rdft::default();
        let fmt = BufferFormat::new(FormatId::Real, 512, 16000).unwrap();
        tfm.set_input_format(&fmt, 3).unwrap();
        assert_eq!(tfm.output_format().id(), FormatId::Complex);
        assert_eq!(tfm.output_format().size(), 257);
        // n + 2 floats, complex pairs with Nyquist.
        assert_eq!(tfm.output_format().unaligned_byte_size(), (512 + 2) * 4);
    }

    #[test]
    fn forward_then_inverse_restores_the_signal() {
        let n = 128;
        let signal: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 5.0 * i as f32 / n as f32).cos())
            .collect();

        let mut forward = Rdft::default();
        let fmt = BufferFormat::new(FormatId::Real, n, 16000).unwrap();
        let spectrum = run_real(&mut forward, fmt, &[signal.clone()]);

        let mut inverse = Irdft::default();
        let complex_fmt = BufferFormat::new(FormatId::Complex, n / 2 + 1, 16000).unwrap();
        let restored = run_real(&mut inverse, complex_fmt, &spectrum);
        for (a, b) in signal.iter().zip(&restored[0]) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn dc_bin_is_the_sum() {
        let mut forward = Rdft::default();
        let fmt = BufferFormat::new(FormatId::Real, 16, 16000).unwrap();
        let spectrum = run_real(&mut forward, fmt, &[vec![1.0; 16]]);
        assert!((spectrum[0][0] - 16.0).abs() < 1e-4);
        assert!(spectrum[0][1].abs() < 1e-5);
    }
}
