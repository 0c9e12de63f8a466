//! Optional write protection of finished buffers.
//!
//! With the `memory-protection` feature enabled (Unix only), the executor
//! marks the page-aligned interior of every produced edge read-only until
//! the range is written again, catching stray writes into buffers whose
//! logical owner has moved on. Without the feature every call is a no-op.

#[cfg(feature = "memory-protection")]
mod imp {
    use crate::arena::{Arena, Binding};

    pub struct MemoryProtector {
        /// (page-aligned address, protected length) currently read-only.
        protected: Vec<(usize, usize)>,
        page_size: usize,
    }

    impl MemoryProtector {
        pub fn new() -> Self {
            // SAFETY: sysconf is always safe to call.
            let page_size = unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) };
            Self {
                protected: Vec::new(),
                page_size: if page_size > 0 { page_size as usize } else { 4096 },
            }
        }

        /// Whole pages strictly inside `[offset, offset + len)`, or None
        /// when the range spans less than one page.
        fn pages(&self, base: usize, offset: usize, len: usize) -> Option<(usize, usize)> {
            let start = base + offset;
            let aligned_start = start.next_multiple_of(self.page_size);
            let end = start + len;
            if aligned_start >= end {
                return None;
            }
            let span = (end - aligned_start) / self.page_size * self.page_size;
            if span == 0 {
                None
            } else {
                Some((aligned_start, span))
            }
        }

        fn set(&self, address: usize, len: usize, prot: libc::c_int) {
            // SAFETY: the range lies inside the engine-owned arena block and
            // is page-aligned by construction.
            let result = unsafe { libc::mprotect(address as *mut libc::c_void, len, prot) };
            if result != 0 {
                log::warn!("mprotect({address:#x}, {len}) failed");
            }
        }

        pub fn protect(&mut self, arena: &Arena, binding: &Binding) {
            let base = arena.base_ptr() as usize;
            if let Some((address, len)) = self.pages(base, binding.offset, binding.byte_len()) {
                self.set(address, len, libc::PROT_READ);
                self.protected.push((address, len));
            }
        }

        pub fn unprotect(&mut self, arena: &Arena, binding: &Binding) {
            let base = arena.base_ptr() as usize;
            if let Some((address, len)) = self.pages(base, binding.offset, binding.byte_len()) {
                let overlaps = |&(a, l): &(usize, usize)| a < address + len && address < a + l;
                // Restore every overlapping recorded range in full; a write
                // target may reuse bytes of several finished edges.
                let mut kept = Vec::with_capacity(self.protected.len());
                for range in std::mem::take(&mut self.protected) {
                    if overlaps(&range) {
                        self.set(range.0, range.1, libc::PROT_READ | libc::PROT_WRITE);
                    } else {
                        kept.push(range);
                    }
                }
                self.protected = kept;
            }
        }

        pub fn release_all(&mut self) {
            for (address, len) in std::mem::take(&mut self.protected) {
                self.set(address, len, libc::PROT_READ | libc::PROT_WRITE);
            }
        }
    }

    impl Drop for MemoryProtector {
        fn drop(&mut self) {
            self.release_all();
        }
    }
}

#[cfg(not(feature = "memory-protection"))]
mod imp {
    use crate::arena::{Arena, Binding};

    /// No-op stand-in used when the platform cannot (or should not)
    /// protect memory at page granularity.
    pub struct MemoryProtector;

    impl MemoryProtector {
        pub fn new() -> Self {
            Self
        }

        pub fn protect(&mut self, _arena: &Arena, _binding: &Binding) {}

        pub fn unprotect(&mut self, _arena: &Arena, _binding: &Binding) {}

        pub fn release_all(&mut self) {}
    }
}

pub(crate) use imp::MemoryProtector;
