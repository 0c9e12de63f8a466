//! The shared buffer arena backing every edge of the frozen transform tree.
//!
//! The allocation planner computes one contiguous block for the whole tree
//! and hands every node a [`Binding`] into it. Payload slots always start on
//! a 128-byte boundary, so casting to `&[f32]` or `&[i16]` with `bytemuck`
//! never fails on alignment.

use crate::error::{SfeError, SfeResult};
use crate::format::{BufferFormat, ALIGNMENT};

/// One contiguous memory block owned by the engine for its whole lifetime.
///
/// Backed by `u128` words so the block start is at least 16-byte aligned;
/// slot *offsets* are multiples of [`ALIGNMENT`] which keeps every payload
/// SIMD-friendly regardless of where the allocator put the block.
pub struct Arena {
    words: Vec<u128>,
    len: usize,
}

impl Arena {
    /// Allocates a zeroed block of at least `bytes` bytes.
    ///
    /// Fails with `AllocationFailed` when the host allocator refuses the
    /// reservation instead of aborting the process.
    pub fn new(bytes: usize) -> SfeResult<Self> {
        let words = bytes.div_ceil(16);
        let mut storage: Vec<u128> = Vec::new();
        storage
            .try_reserve_exact(words)
            .map_err(|_| SfeError::AllocationFailed { bytes })?;
        storage.resize(words, 0);
        Ok(Self {
            words: storage,
            len: bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    /// Base address of the block, used by the page protector.
    #[cfg(feature = "memory-protection")]
    pub fn base_ptr(&self) -> *const u8 {
        self.words.as_ptr() as *const u8
    }
}

/// Where a node's output buffers live inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Byte offset of the first slot, a multiple of [`ALIGNMENT`].
    pub offset: usize,
    /// Bytes between consecutive slots (the aligned payload size).
    pub stride: usize,
    /// Number of payload slots on this edge.
    pub count: usize,
    pub format: BufferFormat,
}

impl Binding {
    pub fn new(offset: usize, count: usize, format: BufferFormat) -> Self {
        debug_assert_eq!(offset % ALIGNMENT, 0);
        Self {
            offset,
            stride: format.aligned_byte_size(),
            count,
            format,
        }
    }

    /// Total extent of this edge in bytes.
    pub fn byte_len(&self) -> usize {
        self.stride * self.count
    }

    pub fn end(&self) -> usize {
        self.offset + self.byte_len()
    }
}

/// Read-only view over one edge's buffers.
#[derive(Clone, Copy)]
pub struct BufferView<'a> {
    format: BufferFormat,
    count: usize,
    stride: usize,
    data: &'a [u8],
}

impl<'a> BufferView<'a> {
    pub fn new(binding: &Binding, data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= binding.byte_len());
        Self {
            format: binding.format,
            count: binding.count,
            stride: binding.stride,
            data: &data[..binding.byte_len()],
        }
    }

    pub fn format(&self) -> &BufferFormat {
        &self.format
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn slot(&self, index: usize) -> &'a [u8] {
        let start = index * self.stride;
        &self.data[start..start + self.format.unaligned_byte_size()]
    }

    /// The `index`-th payload as raw bytes (unaligned size).
    pub fn bytes(&self, index: usize) -> &'a [u8] {
        self.slot(index)
    }

    /// The `index`-th payload as floats. Complex payloads are interleaved
    /// re/im pairs, so the slice holds `2 * size` values.
    pub fn real(&self, index: usize) -> &'a [f32] {
        bytemuck::cast_slice(self.slot(index))
    }

    pub fn int16(&self, index: usize) -> &'a [i16] {
        bytemuck::cast_slice(self.slot(index))
    }
}

/// Mutable view over one edge's buffers.
pub struct BufferViewMut<'a> {
    format: BufferFormat,
    count: usize,
    stride: usize,
    data: &'a mut [u8],
}

impl<'a> BufferViewMut<'a> {
    pub fn new(binding: &Binding, data: &'a mut [u8]) -> Self {
        debug_assert!(data.len() >= binding.byte_len());
        let len = binding.byte_len();
        Self {
            format: binding.format,
            count: binding.count,
            stride: binding.stride,
            data: &mut data[..len],
        }
    }

    pub fn format(&self) -> &BufferFormat {
        &self.format
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn as_view(&self) -> BufferView<'_> {
        BufferView {
            format: self.format,
            count: self.count,
            stride: self.stride,
            data: self.data,
        }
    }

    fn slot_mut(&mut self, index: usize) -> &mut [u8] {
        let start = index * self.stride;
        let len = self.format.unaligned_byte_size();
        &mut self.data[start..start + len]
    }

    pub fn bytes_mut(&mut self, index: usize) -> &mut [u8] {
        self.slot_mut(index)
    }

    pub fn real_mut(&mut self, index: usize) -> &mut [f32] {
        bytemuck::cast_slice_mut(self.slot_mut(index))
    }

    pub fn int16_mut(&mut self, index: usize) -> &mut [i16] {
        bytemuck::cast_slice_mut(self.slot_mut(index))
    }

    /// Splits the view into per-slot float slices for buffer-parallel work.
    pub fn real_rows(&mut self) -> Vec<&mut [f32]> {
        let payload = self.format.unaligned_byte_size();
        self.data
            .chunks_mut(self.stride)
            .take(self.count)
            .map(|chunk| bytemuck::cast_slice_mut(&mut chunk[..payload]))
            .collect()
    }
}

/// Borrows two disjoint bindings from the arena, the first read-only and the
/// second writable. The planner guarantees overlapping lifetimes never share
/// extents, so the ranges either coincide exactly (in-place edges, handled
/// by the caller) or do not touch.
pub fn split_io<'a>(
    bytes: &'a mut [u8],
    input: &Binding,
    output: &Binding,
) -> (BufferView<'a>, BufferViewMut<'a>) {
    debug_assert!(
        input.end() <= output.offset || output.end() <= input.offset,
        "planner produced overlapping bindings"
    );
    if input.end() <= output.offset {
        let (head, tail) = bytes.split_at_mut(output.offset);
        (
            BufferView::new(input, &head[input.offset..]),
            BufferViewMut::new(output, tail),
        )
    } else {
        let (head, tail) = bytes.split_at_mut(input.offset);
        let shifted = Binding {
            offset: 0,
            ..*output
        };
        (
            BufferView::new(input, tail),
            BufferViewMut::new(&shifted, &mut head[output.offset..]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatId;

    fn format(size: usize) -> BufferFormat {
        BufferFormat::new(FormatId::Real, size, 16000).unwrap()
    }

    #[test]
    fn arena_allocates_and_zeroes() {
        let arena = Arena::new(1000).unwrap();
        assert!(arena.len() >= 1000);
        assert!(arena.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn views_round_trip_floats() {
        let fmt = format(3);
        let binding = Binding::new(0, 2, fmt);
        let mut arena = Arena::new(binding.byte_len()).unwrap();
        {
            let mut view = BufferViewMut::new(&binding, arena.bytes_mut());
            view.real_mut(1).copy_from_slice(&[1.0, 2.0, 3.0]);
        }
        let view = BufferView::new(&binding, arena.bytes());
        assert_eq!(view.real(0), &[0.0, 0.0, 0.0]);
        assert_eq!(view.real(1), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn split_io_borrows_disjoint_ranges() {
        let fmt = format(4);
        let input = Binding::new(0, 1, fmt);
        let output = Binding::new(fmt.aligned_byte_size(), 1, fmt);
        let mut arena = Arena::new(output.end()).unwrap();
        {
            let mut view = BufferViewMut::new(&input, arena.bytes_mut());
            view.real_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        }
        let (inp, mut out) = split_io(arena.bytes_mut(), &input, &output);
        let doubled: Vec<f32> = inp.real(0).iter().map(|x| x * 2.0).collect();
        out.real_mut(0).copy_from_slice(&doubled);
        drop(out);
        let view = BufferView::new(&output, &arena.bytes()[output.offset..]);
        assert_eq!(view.real(0), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn split_io_handles_output_before_input() {
        let fmt = format(2);
        let output = Binding::new(0, 1, fmt);
        let input = Binding::new(fmt.aligned_byte_size(), 1, fmt);
        let mut arena = Arena::new(input.end()).unwrap();
        {
            let mut view = BufferViewMut::new(&input, &mut arena.bytes_mut()[input.offset..]);
            view.real_mut(0).copy_from_slice(&[5.0, 6.0]);
        }
        let (inp, mut out) = split_io(arena.bytes_mut(), &input, &output);
        let copied: Vec<f32> = inp.real(0).to_vec();
        out.real_mut(0).copy_from_slice(&copied);
        drop(out);
        assert_eq!(BufferView::new(&output, arena.bytes()).real(0), &[5.0, 6.0]);
    }
}
