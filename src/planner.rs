//! The allocation planner: one contiguous block for every edge's buffers.
//!
//! Edges are given integer birth/death indices from the deterministic
//! execution order. Buffer-invariant transforms whose parent edge has no
//! other consumer alias their parent's storage outright; the remaining
//! storages are placed by greedy first-fit, reusing byte ranges between
//! storages whose lifetimes do not overlap. Slot offsets keep the 128-byte
//! alignment of the format layer.
//!
//! When a memory budget is configured, edges above it whose transform
//! processes buffers independently are marked for sliced execution: the
//! executor will invoke the transform several times over contiguous
//! sub-ranges of the buffer list.

use crate::arena::{Arena, Binding};
use crate::error::SfeResult;
use crate::format::ALIGNMENT;
use crate::tree::{NodeId, Slice, TransformTree};

struct Storage {
    /// Representative node (first member); all members share the extent.
    size: usize,
    birth: usize,
    death: usize,
    offset: usize,
}

pub(crate) fn plan(tree: &mut TransformTree) -> SfeResult<()> {
    let order = tree.exec_order.clone();
    let position: std::collections::HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let horizon = order.len();

    // Lifetimes: an edge is born when its node runs and dies after its last
    // consumer. Named leaves survive to the end so the results can be
    // collected; an unnamed leaf dies immediately.
    let mut death = vec![0usize; tree.nodes.len()];
    for &id in &order {
        let node = &tree.nodes[id];
        death[id] = if node.feature.is_some() {
            horizon
        } else {
            node.children
                .iter()
                .map(|c| position[c])
                .max()
                .unwrap_or(position[&id])
        };
    }

    // In-place aliasing: a buffer-invariant transform that is its parent's
    // only consumer and keeps the buffer count writes straight into the
    // parent's slots.
    let mut storage_of = vec![usize::MAX; tree.nodes.len()];
    let mut storages: Vec<Storage> = Vec::new();
    for &id in &order {
        let node = &tree.nodes[id];
        let aliased = node.parent.is_some_and(|parent| {
            let p = &tree.nodes[parent];
            tree.transforms[node.transform].buffer_invariant()
                && p.children.len() == 1
                && p.buffers_count == node.buffers_count
                && {
                    let nf = tree.transforms[node.transform].output_format();
                    let pf = tree.transforms[p.transform].output_format();
                    nf.id() == pf.id() && nf.size() == pf.size()
                }
        });
        if aliased {
            let parent = node.parent.unwrap_or(0);
            let storage = storage_of[parent];
            storage_of[id] = storage;
            storages[storage].death = storages[storage].death.max(death[id]);
        } else {
            let format = *tree.transforms[node.transform].output_format();
            storage_of[id] = storages.len();
            storages.push(Storage {
                size: format.aligned_byte_size() * node.buffers_count,
                birth: position[&id],
                death: death[id],
                offset: 0,
            });
        }
    }

    // Greedy first-fit in birth order: place each storage at the lowest
    // aligned offset not overlapping any lifetime-overlapping storage.
    let mut peak = 0usize;
    for i in 0..storages.len() {
        let mut live: Vec<(usize, usize)> = (0..i)
            .filter(|&j| {
                storages[j].birth <= storages[i].death && storages[i].birth <= storages[j].death
            })
            .map(|j| (storages[j].offset, storages[j].size))
            .collect();
        live.sort_unstable();
        let mut offset = 0usize;
        for (start, size) in live {
            if offset + storages[i].size <= start {
                break;
            }
            offset = offset.max(start + size);
            offset = offset.next_multiple_of(ALIGNMENT.max(1));
        }
        storages[i].offset = offset;
        peak = peak.max(offset + storages[i].size);
    }

    // Bind every node to its storage range.
    for id in 0..tree.nodes.len() {
        let format = *tree.transforms[tree.nodes[id].transform].output_format();
        let offset = storages[storage_of[id]].offset;
        let count = tree.nodes[id].buffers_count;
        tree.nodes[id].binding = Some(Binding::new(offset, count, format));
    }

    // Slicing marks: oversized uniform-count edges of slice-safe transforms
    // run in several invocations over contiguous buffer ranges.
    if let Some(budget) = tree.config.memory_budget {
        for &id in order.iter().skip(1) {
            let node = &tree.nodes[id];
            let Some(parent) = node.parent else { continue };
            let binding = match node.binding {
                Some(b) => b,
                None => continue,
            };
            let sliceable = tree.transforms[node.transform].slice_safe()
                && node.buffers_count == tree.nodes[parent].buffers_count
                && node.buffers_count > 1
                && binding.byte_len() > budget;
            if sliceable {
                let per_slice = (budget / binding.stride.max(1)).max(1);
                let cycles = node.buffers_count.div_ceil(per_slice);
                let slices = (0..cycles)
                    .map(|cycle| {
                        let start = cycle * per_slice;
                        Slice {
                            start,
                            length: per_slice.min(node.buffers_count - start),
                            cycle,
                        }
                    })
                    .collect();
                tree.nodes[id].slices = slices;
                log::debug!(
                    "node {} ({}) sliced into {} cycles",
                    id,
                    tree.class_of(id),
                    cycles
                );
            }
        }
    }

    tree.arena = Some(Arena::new(peak)?);
    Ok(())
}
