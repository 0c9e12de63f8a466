//! The transform contract and the helpers shared by its implementors.
//!
//! A transform binds an algorithm to a parameter map and a pair of buffer
//! formats. The output format is derived from the input format inside
//! `set_input_format`, which also reports how many output buffers the
//! transform produces for a given input count (windowing splits one buffer
//! into many, merging does the opposite).
//!
//! Buffer-parallel transforms fan their per-buffer loop out over a bounded,
//! process-wide worker pool; `threads_num=1` disables the fan-out.

use once_cell::sync::Lazy;
use rayon::prelude::*;

use crate::arena::{BufferView, BufferViewMut};
use crate::error::{SfeError, SfeResult};
use crate::format::BufferFormat;
use crate::parameters::{ParameterDescriptor, ParameterMap};

/// The public interface of every transform.
pub trait Transform: Send + Sync {
    /// Class name, unique in the registry.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn supported_parameters(&self) -> &'static [ParameterDescriptor];

    /// Current values, defaults filled in. Ordered by name so the
    /// deduplication fingerprint is stable.
    fn parameters(&self) -> &ParameterMap;

    /// Validates and stores one parameter. Fails with `UnknownParameter`
    /// for names outside `supported_parameters` and `InvalidValue` when the
    /// text does not parse or violates the parameter's constraints.
    fn set_parameter(&mut self, name: &str, value: &str) -> SfeResult<()>;

    fn input_format(&self) -> &BufferFormat;

    fn output_format(&self) -> &BufferFormat;

    /// Stores the input format, derives the output format and returns the
    /// number of output buffers produced for `buffers_count` inputs.
    fn set_input_format(&mut self, format: &BufferFormat, buffers_count: usize)
        -> SfeResult<usize>;

    /// Called once after all formats have settled; may precompute tables.
    fn initialize(&mut self) -> SfeResult<()> {
        Ok(())
    }

    /// True when the output may safely alias the input buffers.
    fn buffer_invariant(&self) -> bool {
        false
    }

    /// True when `process` handles every buffer independently, so the
    /// executor may invoke it over contiguous slices of the buffer list.
    fn slice_safe(&self) -> bool {
        true
    }

    /// The kernel: reads `input`, fills `output`.
    fn process(&self, input: &BufferView<'_>, output: &mut BufferViewMut<'_>) -> SfeResult<()>;

    /// In-place variant, only invoked when `buffer_invariant` returned true
    /// and the planner aliased this edge onto its parent.
    fn process_in_place(&self, _io: &mut BufferViewMut<'_>) -> SfeResult<()> {
        Err(SfeError::InvalidOutput {
            class: self.name().to_string(),
            message: "transform does not support in-place execution".to_string(),
        })
    }
}

/// Applies a parsed parameter map to an instance, surfacing
/// `UnknownParameter` before the per-value validation runs.
pub fn apply_parameters(transform: &mut dyn Transform, parameters: &ParameterMap) -> SfeResult<()> {
    for (name, value) in parameters {
        if !transform
            .supported_parameters()
            .iter()
            .any(|d| d.name == name)
        {
            return Err(SfeError::UnknownParameter {
                class: transform.name().to_string(),
                name: name.clone(),
            });
        }
        transform.set_parameter(name, value)?;
    }
    Ok(())
}

/// Two instances are observationally equivalent when the class matches and
/// every parameter pair matches exactly.
pub fn equivalent(a: &dyn Transform, b: &dyn Transform) -> bool {
    a.name() == b.name() && a.parameters() == b.parameters()
}

/// Cache key for engine-wide instance deduplication: class name followed by
/// the sorted parameter pairs.
pub fn fingerprint(transform: &dyn Transform) -> String {
    let mut key = transform.name().to_string();
    for (name, value) in transform.parameters() {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// The `threads_num` parameter shared by every buffer-parallel transform.
/// `0` means "the engine-wide maximum".
pub const THREADS_NUM: ParameterDescriptor = ParameterDescriptor {
    name: "threads_num",
    description: "The maximal number of worker threads to use; 0 picks the host maximum.",
    default: "0",
};

/// Host core count; the upper bound of every worker fan-out.
pub fn max_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

static WORKER_POOL: Lazy<Option<rayon::ThreadPool>> = Lazy::new(|| {
    rayon::ThreadPoolBuilder::new()
        .num_threads(max_worker_threads())
        .thread_name(|i| format!("sfe-worker-{i}"))
        .build()
        .ok()
});

/// Runs `kernel` over every output row, fanning out across the worker pool
/// when `threads` allows it. Rows are disjoint float slices, one per output
/// buffer, so no synchronization is needed inside the kernel.
pub(crate) fn for_each_row<F>(threads: usize, output: &mut BufferViewMut<'_>, kernel: F)
where
    F: Fn(usize, &mut [f32]) + Sync,
{
    let effective = if threads == 0 {
        max_worker_threads()
    } else {
        threads.min(max_worker_threads())
    };
    let count = output.count();
    if effective <= 1 || count < 2 {
        for i in 0..count {
            kernel(i, output.real_mut(i));
        }
        return;
    }
    // Bounding the split size bounds the fan-out to `effective` tasks.
    let min_rows_per_task = count.div_ceil(effective);
    match WORKER_POOL.as_ref() {
        Some(pool) => pool.install(|| {
            output
                .real_rows()
                .into_par_iter()
                .enumerate()
                .with_min_len(min_rows_per_task)
                .for_each(|(i, row)| kernel(i, row));
        }),
        None => {
            for i in 0..count {
                kernel(i, output.real_mut(i));
            }
        }
    }
}
