//! Region - one contiguous block of backing memory.
//!
//! A [`Region`] is owned by exactly one party at a time: either idle in the
//! [`BufferPool`](super::BufferPool) or checked out by a
//! [`ManagedBuffer`](crate::ManagedBuffer). It moves between the two and is
//! never aliased.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use crate::common::config::DIRECT_ALIGNMENT;
use crate::common::Strategy;

/// Backing memory for a buffer.
pub(crate) enum Region {
    /// Zero-size sentinel. Never pooled.
    Empty,
    /// Ordinary heap memory.
    Heap(Box<[u8]>),
    /// Page-aligned memory with a stable address.
    Direct(DirectRegion),
}

impl Region {
    /// Allocate a zeroed region of exactly `len` bytes.
    pub(crate) fn allocate(strategy: Strategy, len: usize) -> Self {
        if len == 0 {
            return Region::Empty;
        }
        match strategy {
            Strategy::Heap => Region::Heap(vec![0u8; len].into_boxed_slice()),
            Strategy::Direct => Region::Direct(DirectRegion::new(len)),
        }
    }

    /// Take ownership of an existing vector as a heap region.
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        if bytes.is_empty() {
            Region::Empty
        } else {
            Region::Heap(bytes.into_boxed_slice())
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Region::Empty)
    }

    /// Strategy this region was allocated with, `None` for the sentinel.
    #[inline]
    pub(crate) fn strategy(&self) -> Option<Strategy> {
        match self {
            Region::Empty => None,
            Region::Heap(_) => Some(Strategy::Heap),
            Region::Direct(_) => Some(Strategy::Direct),
        }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Region::Empty => &[],
            Region::Heap(bytes) => &bytes[..],
            Region::Direct(direct) => direct.as_slice(),
        }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Region::Empty => &mut [],
            Region::Heap(bytes) => &mut bytes[..],
            Region::Direct(direct) => direct.as_mut_slice(),
        }
    }

    /// Zero out the whole region before it is handed out again.
    pub(crate) fn reset(&mut self) {
        self.as_mut_slice().fill(0);
    }
}

/// A zeroed allocation aligned to [`DIRECT_ALIGNMENT`].
pub(crate) struct DirectRegion {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: DirectRegion uniquely owns its allocation, like Box<[u8]>.
unsafe impl Send for DirectRegion {}
// SAFETY: shared access only hands out &[u8].
unsafe impl Sync for DirectRegion {}

impl DirectRegion {
    fn new(len: usize) -> Self {
        let layout = Self::layout(len);
        // SAFETY: callers never pass len == 0, so the layout is non-zero sized.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).unwrap_or_else(|| handle_alloc_error(layout));
        Self { ptr, len }
    }

    fn layout(len: usize) -> Layout {
        match Layout::from_size_align(len, DIRECT_ALIGNMENT) {
            Ok(layout) => layout,
            Err(_) => panic!("direct region of {} bytes exceeds the address space", len),
        }
    }

    #[inline]
    fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialized bytes for the lifetime of self.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for DirectRegion {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated in new() with this exact layout.
        unsafe { dealloc(self.ptr.as_ptr(), Self::layout(self.len)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_len_is_sentinel() {
        let region = Region::allocate(Strategy::Direct, 0);
        assert!(region.is_empty());
        assert_eq!(region.len(), 0);
        assert_eq!(region.strategy(), None);
    }

    #[test]
    fn test_heap_region_zeroed() {
        let region = Region::allocate(Strategy::Heap, 128);
        assert_eq!(region.len(), 128);
        assert_eq!(region.strategy(), Some(Strategy::Heap));
        assert!(region.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_direct_region_aligned() {
        let mut region = Region::allocate(Strategy::Direct, 100);
        assert_eq!(region.len(), 100);
        assert_eq!(region.as_slice().as_ptr() as usize % DIRECT_ALIGNMENT, 0);

        region.as_mut_slice()[99] = 0xAB;
        assert_eq!(region.as_slice()[99], 0xAB);
    }

    #[test]
    fn test_reset() {
        let mut region = Region::allocate(Strategy::Direct, 64);
        region.as_mut_slice().fill(0xFF);

        region.reset();

        assert!(region.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_from_vec() {
        let region = Region::from_vec(vec![1, 2, 3]);
        assert_eq!(region.as_slice(), &[1, 2, 3]);
        assert!(Region::from_vec(Vec::new()).is_empty());
    }
}
