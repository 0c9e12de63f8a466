//! Buffer formats: the value type describing what an edge's bytes mean.
//!
//! A [`BufferFormat`] carries a stable identifier, the semantic element
//! count and the sampling rate. Equality is intentionally reflexive with
//! the [`FormatId::Identity`] sentinel so a pass-through transform can act
//! as a wildcard inside the transform tree. Sizes and sampling rates are
//! mutable while the tree is being built and must not change after it is
//! frozen.

use crate::arena::BufferView;
use crate::error::{SfeError, SfeResult};

/// Payload slots always start on this boundary inside the backing block.
pub const ALIGNMENT: usize = 128;

pub const MIN_SAMPLING_RATE: u32 = 2_000;
pub const MAX_SAMPLING_RATE: u32 = 48_000;

/// Rounds a byte size up to the next [`ALIGNMENT`] boundary.
pub const fn aligned(bytes: usize) -> usize {
    if bytes % ALIGNMENT == 0 {
        bytes
    } else {
        (bytes / ALIGNMENT + 1) * ALIGNMENT
    }
}

/// The stable identifier of a buffer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatId {
    /// Signed 16-bit PCM samples; the source waveform format.
    Int16,
    /// An array of 32-bit floats.
    Real,
    /// Interleaved re/im pairs of 32-bit floats; the element count is the
    /// number of complex values.
    Complex,
    /// A single 32-bit float per buffer.
    Single,
    /// The wildcard sentinel, equal to every other format.
    Identity,
}

impl FormatId {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatId::Int16 => "ArrayInt16",
            FormatId::Real => "ArrayRealFloat",
            FormatId::Complex => "ArrayComplexFloat",
            FormatId::Single => "Single",
            FormatId::Identity => "Identity",
        }
    }

    /// Bytes per semantic element.
    pub fn element_size(&self) -> usize {
        match self {
            FormatId::Int16 => 2,
            FormatId::Real => 4,
            FormatId::Complex => 8,
            FormatId::Single => 4,
            FormatId::Identity => 0,
        }
    }
}

impl std::fmt::Display for FormatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes the data shape at one edge of the transform tree.
#[derive(Debug, Clone, Copy)]
pub struct BufferFormat {
    id: FormatId,
    size: usize,
    sampling_rate: u32,
}

impl BufferFormat {
    pub fn new(id: FormatId, size: usize, sampling_rate: u32) -> SfeResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;
        Ok(Self {
            id,
            size,
            sampling_rate,
        })
    }

    /// The wildcard format, equal to anything.
    pub fn identity(sampling_rate: u32) -> SfeResult<Self> {
        Self::new(FormatId::Identity, 0, sampling_rate)
    }

    /// Initial format of a freshly constructed transform, before the tree
    /// binds the real one through `set_input_format`.
    pub(crate) fn placeholder(id: FormatId) -> Self {
        Self {
            id,
            size: 0,
            sampling_rate: MIN_SAMPLING_RATE,
        }
    }

    pub fn validate_sampling_rate(value: u32) -> SfeResult<()> {
        if !(MIN_SAMPLING_RATE..=MAX_SAMPLING_RATE).contains(&value) {
            return Err(SfeError::InvalidSamplingRate(value));
        }
        Ok(())
    }

    pub fn id(&self) -> FormatId {
        self.id
    }

    /// Semantic element count of one payload.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn set_sampling_rate(&mut self, value: u32) -> SfeResult<()> {
        Self::validate_sampling_rate(value)?;
        self.sampling_rate = value;
        Ok(())
    }

    /// Copies the source details (sampling rate) from another format.
    pub fn copy_source_details_from(&mut self, other: &BufferFormat) {
        self.sampling_rate = other.sampling_rate;
    }

    pub fn unaligned_byte_size(&self) -> usize {
        self.size * self.id.element_size()
    }

    /// Payload size rounded up to the slot alignment.
    pub fn aligned_byte_size(&self) -> usize {
        aligned(self.unaligned_byte_size())
    }

    /// Runtime invariant check used by the output validator: array payloads
    /// must not be entirely zero and every float must be finite.
    pub fn validate(&self, buffers: &BufferView<'_>) -> Result<(), String> {
        match self.id {
            FormatId::Identity => Ok(()),
            FormatId::Int16 => {
                for i in 0..buffers.count() {
                    if buffers.int16(i).iter().all(|&v| v == 0) {
                        return Err(format!("buffer {i} contains only zeros"));
                    }
                }
                Ok(())
            }
            FormatId::Real | FormatId::Complex | FormatId::Single => {
                for i in 0..buffers.count() {
                    let payload = buffers.real(i);
                    for (j, value) in payload.iter().enumerate() {
                        if !value.is_finite() {
                            return Err(format!("element {j} of buffer {i} is {value}"));
                        }
                    }
                    if self.id != FormatId::Single && payload.iter().all(|&v| v == 0.0) {
                        return Err(format!("buffer {i} contains only zeros"));
                    }
                }
                Ok(())
            }
        }
    }

    /// Deterministic textual representation of one payload, for debugging.
    pub fn dump(&self, buffers: &BufferView<'_>, index: usize) -> String {
        let mut out = format!("{} [{} x {}]:", self.id, buffers.count(), self.size);
        match self.id {
            FormatId::Identity => out,
            FormatId::Int16 => {
                for value in buffers.int16(index) {
                    out.push_str(&format!(" {value}"));
                }
                out
            }
            _ => {
                for value in buffers.real(index) {
                    out.push_str(&format!(" {value:.6}"));
                }
                out
            }
        }
    }
}

impl PartialEq for BufferFormat {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id || self.id == FormatId::Identity || other.id == FormatId::Identity
    }
}

impl Eq for BufferFormat {}

impl std::fmt::Display for BufferFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} @ {} Hz", self.id, self.size, self.sampling_rate)
    }
}
