//! Execution of the frozen transform tree.
//!
//! The executor walks the nodes in the deterministic linear order wired by
//! `prepare_for_execution`, invokes each transform over the arena-backed
//! buffer views, and gathers the named leaf buffers into the result map.
//! Per-node wall-clock time feeds the per-class aggregator behind the time
//! report; the optional validator, buffer dumper and memory protector hook
//! in between invocations.
//!
//! The walk itself is single-threaded; only opted-in transforms fan their
//! inner per-buffer loops out to the worker pool. For any edge the producer
//! returns before the consumer is invoked.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::arena::{split_io, Binding, BufferView, BufferViewMut};
use crate::dump;
use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, FormatId};
use crate::protector::MemoryProtector;
use crate::tree::TransformTree;

/// Owned copy of one feature's output buffers, detached from the arena.
#[derive(Debug)]
pub struct FeatureBuffers {
    format: BufferFormat,
    count: usize,
    width: usize,
    data: Vec<f32>,
}

impl FeatureBuffers {
    pub fn format(&self) -> &BufferFormat {
        &self.format
    }

    /// Number of payload buffers.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The `index`-th payload as floats. Complex payloads are interleaved
    /// re/im pairs; int16 payloads are widened on collection.
    pub fn values(&self, index: usize) -> &[f32] {
        &self.data[index * self.width..(index + 1) * self.width]
    }
}

impl TransformTree {
    /// Runs every transform over `waveform` and returns the named feature
    /// buffers. The tree must have been prepared; the waveform length must
    /// match the source buffer size given to `new`.
    pub fn execute(&mut self, waveform: &[i16]) -> SfeResult<BTreeMap<String, FeatureBuffers>> {
        if !self.is_frozen() {
            return Err(SfeError::TreeNotFrozen);
        }
        if self.features().is_empty() {
            return Err(SfeError::EmptyTree);
        }
        if waveform.len() != self.root_format().size() {
            return Err(SfeError::InvalidInput(format!(
                "waveform holds {} samples, the engine was built for {}",
                waveform.len(),
                self.root_format().size()
            )));
        }

        let mut arena = self.arena.take().ok_or(SfeError::TreeNotFrozen)?;
        let mut protector = MemoryProtector::new();
        let result = self.run(waveform, &mut arena, &mut protector);
        protector.release_all();
        self.arena = Some(arena);
        result
    }

    fn run(
        &mut self,
        waveform: &[i16],
        arena: &mut crate::arena::Arena,
        protector: &mut MemoryProtector,
    ) -> SfeResult<BTreeMap<String, FeatureBuffers>> {
        let order = self.exec_order.clone();
        let root = order[0];
        let root_binding = self.nodes[root].binding.ok_or(SfeError::TreeNotFrozen)?;

        // Install the waveform as the root node's output buffer.
        {
            let mut view =
                BufferViewMut::new(&root_binding, &mut arena.bytes_mut()[root_binding.offset..]);
            view.int16_mut(0).copy_from_slice(waveform);
            if self.config.validate_output {
                root_binding
                    .format
                    .validate(&view.as_view())
                    .map_err(SfeError::InvalidInput)?;
            }
        }

        let dump_dir = dump::directory(self.config.dump_dir.as_deref());
        let started = Instant::now();

        // Cache-friendly linear walk along the wired `next` pointers.
        let mut cursor = self.nodes[root].next;
        while let Some(id) = cursor {
            let class = self.class_of(id);
            let binding = self.nodes[id].binding.ok_or(SfeError::TreeNotFrozen)?;
            let parent = self.nodes[id].parent.ok_or(SfeError::TreeNotFrozen)?;
            let parent_binding = self.nodes[parent].binding.ok_or(SfeError::TreeNotFrozen)?;
            let slices = self.nodes[id].slices.clone();
            let in_place = binding.offset == parent_binding.offset
                && binding.byte_len() == parent_binding.byte_len();

            protector.unprotect(arena, &binding);
            let node_started = Instant::now();
            {
                let transform = self.transforms[self.nodes[id].transform].as_ref();
                let bytes = arena.bytes_mut();
                if slices.is_empty() {
                    if in_place {
                        let mut io = BufferViewMut::new(&binding, &mut bytes[binding.offset..]);
                        transform.process_in_place(&mut io)?;
                    } else {
                        let (input, mut output) = split_io(bytes, &parent_binding, &binding);
                        transform.process(&input, &mut output)?;
                    }
                } else {
                    // Sliced execution: one invocation per contiguous range
                    // of the buffer list, in cycle order.
                    for slice in &slices {
                        let sub_out = sub_binding(&binding, slice.start, slice.length);
                        if in_place {
                            let mut io =
                                BufferViewMut::new(&sub_out, &mut bytes[sub_out.offset..]);
                            transform.process_in_place(&mut io)?;
                        } else {
                            let sub_in = sub_binding(&parent_binding, slice.start, slice.length);
                            let (input, mut output) = split_io(bytes, &sub_in, &sub_out);
                            transform.process(&input, &mut output)?;
                        }
                    }
                }
            }
            let elapsed = node_started.elapsed();
            self.nodes[id].elapsed += elapsed;
            *self.class_times.entry(class.to_string()).or_default() += elapsed;
            *self.invocations.entry(class.to_string()).or_default() += 1;

            let view = BufferView::new(&binding, &arena.bytes()[binding.offset..]);
            if self.config.validate_output {
                if let Err(message) = binding.format.validate(&view) {
                    log::debug!("offending payload: {}", binding.format.dump(&view, 0));
                    return Err(SfeError::InvalidOutput {
                        class: class.to_string(),
                        message,
                    });
                }
            }
            if dump::requested(class) {
                let path = dump::write(class, &view, &dump_dir)?;
                log::debug!("dumped {class} buffers to {}", path.display());
            }
            protector.protect(arena, &binding);
            cursor = self.nodes[id].next;
        }

        self.total_time += started.elapsed();

        let mut results = BTreeMap::new();
        for &id in &order {
            if let Some(feature) = self.nodes[id].feature.clone() {
                let binding = self.nodes[id].binding.ok_or(SfeError::TreeNotFrozen)?;
                let view = BufferView::new(&binding, &arena.bytes()[binding.offset..]);
                results.insert(feature, collect(&binding, &view));
            }
        }
        Ok(results)
    }

    /// Per-class share of the total execution time, plus the synthetic
    /// `"Total"` (absolute nanoseconds) and `"Other"` (residual share).
    pub fn time_report(&self) -> BTreeMap<String, f64> {
        let mut report = BTreeMap::new();
        let total = self.total_time.as_nanos();
        if total == 0 {
            return report;
        }
        let mut accounted = 0u128;
        for (class, elapsed) in &self.class_times {
            accounted += elapsed.as_nanos();
            report.insert(class.clone(), elapsed.as_nanos() as f64 / total as f64);
        }
        report.insert("Total".to_string(), total as f64);
        report.insert(
            "Other".to_string(),
            total.saturating_sub(accounted) as f64 / total as f64,
        );
        report
    }
}

fn sub_binding(binding: &Binding, start: usize, length: usize) -> Binding {
    Binding {
        offset: binding.offset + start * binding.stride,
        stride: binding.stride,
        count: length,
        format: binding.format,
    }
}

fn collect(binding: &Binding, view: &BufferView<'_>) -> FeatureBuffers {
    let format = binding.format;
    let count = binding.count;
    match format.id() {
        FormatId::Int16 => {
            let width = format.size();
            let mut data = Vec::with_capacity(count * width);
            for i in 0..count {
                data.extend(view.int16(i).iter().map(|&v| v as f32));
            }
            FeatureBuffers {
                format,
                count,
                width,
                data,
            }
        }
        _ => {
            let width = format.unaligned_byte_size() / 4;
            let mut data = Vec::with_capacity(count * width);
            for i in 0..count {
                data.extend_from_slice(view.real(i));
            }
            FeatureBuffers {
                format,
                count,
                width,
                data,
            }
        }
    }
}
