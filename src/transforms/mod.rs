//! The shipped transforms.
//!
//! Every class listed in [`builtin_factories`] is registered with the
//! process-wide registry on first use; the tree builder resolves recipe
//! entries against that set.

pub mod converters;
pub mod dct;
pub mod diff;
pub mod energy;
pub mod filter_bank;
pub mod identity;
pub mod iir;
pub mod log;
pub mod magnitude;
pub mod merge;
pub mod preemphasis;
pub mod rdft;
pub mod selector;
pub mod spectral;
pub mod stats;
pub mod stmsn;
pub mod window;

use crate::registry::TransformFactory;
use crate::transform::Transform;

/// Factories of every builtin transform class, in registration order.
pub(crate) fn builtin_factories() -> Vec<TransformFactory> {
    vec![
        || Box::new(window::Window::default()) as Box<dyn Transform>,
        || Box::new(window::WindowMerge::default()),
        || Box::new(preemphasis::Preemphasis::default()),
        || Box::new(rdft::Rdft::default()),
        || Box::new(rdft::Irdft::default()),
        || Box::new(dct::Dct::default()),
        || Box::new(dct::Idct::default()),
        || Box::new(magnitude::ComplexMagnitude::default()),
        || Box::new(magnitude::SpectralEnergy::default()),
        || Box::new(filter_bank::FilterBank::default()),
        || Box::new(log::Log::default()),
        || Box::new(log::Square::default()),
        || Box::new(selector::Selector::default()),
        || Box::new(stmsn::Stmsn::default()),
        || Box::new(energy::Energy::default()),
        || Box::new(energy::ZeroCrossings::default()),
        || Box::new(spectral::Centroid::default()),
        || Box::new(spectral::Rolloff::default()),
        || Box::new(spectral::Flux::default()),
        || Box::new(merge::Merge::default()),
        || Box::new(stats::Stats::default()),
        || Box::new(diff::Diff::default()),
        || Box::new(diff::Delta::default()),
        || Box::new(iir::IirFilter::default()),
        || Box::new(identity::Identity::default()),
        || Box::new(converters::Int16ToFloat::default()),
        || Box::new(converters::FloatToInt16::default()),
        || Box::new(converters::SingleToReal::default()),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::arena::{split_io, Arena, Binding, BufferViewMut};
    use crate::format::BufferFormat;
    use crate::transform::Transform;

    /// Drives one transform end to end over float payloads: binds the input
    /// format, initializes, fills an arena with `inputs` and returns the
    /// produced buffers.
    pub(crate) fn run_real(
        tfm: &mut dyn Transform,
        input_fmt: BufferFormat,
        inputs: &[Vec<f32>],
    ) -> Vec<Vec<f32>> {
        let count = inputs.len();
        let produced = tfm.set_input_format(&input_fmt, count).unwrap();
        tfm.initialize().unwrap();
        let in_binding = Binding::new(0, count, input_fmt);
        let out_binding = Binding::new(in_binding.end(), produced, *tfm.output_format());
        let mut arena = Arena::new(out_binding.end()).unwrap();
        {
            let mut view = BufferViewMut::new(&in_binding, arena.bytes_mut());
            for (i, data) in inputs.iter().enumerate() {
                view.real_mut(i).copy_from_slice(data);
            }
        }
        let (input, mut output) = split_io(arena.bytes_mut(), &in_binding, &out_binding);
        tfm.process(&input, &mut output).unwrap();
        let view = output.as_view();
        (0..produced).map(|i| view.real(i).to_vec()).collect()
    }
}
