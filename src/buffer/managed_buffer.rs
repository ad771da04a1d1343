//! ManagedBuffer - the unit of read/write for key-value codecs.
//!
//! A [`ManagedBuffer`] owns one pooled [`Region`] and tracks two cursors over
//! it:
//! ```text
//! ┌───────────────┬──────────────────┬──────────────────┐
//! │  already read │  readable bytes  │  writable bytes  │
//! └───────────────┴──────────────────┴──────────────────┘
//! 0            reader             writer            capacity
//! ```
//! The buffer is live from allocation until [`release`](ManagedBuffer::release),
//! which returns the region to the pool. Using a buffer after release, or
//! releasing it twice, is a bug and panics.

use std::backtrace::Backtrace;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::buffer::capacity_tracker::next_capacity;
use crate::buffer::{LeakDetection, ReleaseSignal};
use crate::common::{Error, Result, Strategy};
use crate::pool::{BufferPool, Region};

/// Number of unread bytes shown by `Display`/`Debug`.
const PREVIEW_BYTES: usize = 10;

/// A pooled, growable byte buffer with exactly-once release.
///
/// # Ownership
/// The backing region is moved out of the pool on allocation and moved back
/// on release; it is never shared. Read-only views borrow the buffer, so the
/// borrow checker keeps writers out while a view is alive.
///
/// # Thread Safety
/// `ManagedBuffer` is `Send` but is meant to be driven by one owner at a
/// time. Other threads coordinate with the owner through
/// [`release_signal`](Self::release_signal).
///
/// # Example
/// ```
/// use codecbuf::BufferAllocator;
///
/// let allocator = BufferAllocator::new();
/// let mut buffer = allocator.allocate_direct(-4);
/// buffer.put_i32(7)?.put_u8(1)?;
/// assert_eq!(buffer.readable_bytes(), 5);
/// assert_eq!(buffer.drain_to_vec(), vec![0, 0, 0, 7, 1]);
/// buffer.release();
/// # Ok::<(), codecbuf::Error>(())
/// ```
pub struct ManagedBuffer {
    /// Backing memory; `Region::Empty` once released.
    pub(crate) region: Region,
    pub(crate) reader: usize,
    pub(crate) writer: usize,
    pub(crate) capacity: usize,
    max_capacity: usize,
    /// Fixed at allocation; shrinking never makes a buffer growable.
    growable: bool,
    strategy: Strategy,
    released: bool,
    signal: ReleaseSignal,
    leak_detection: LeakDetection,
    /// Allocation site, captured only while leak detection is on.
    allocation: Option<Backtrace>,
    pub(crate) pool: Arc<BufferPool>,
}

impl ManagedBuffer {
    /// Construct a live buffer over `region`.
    ///
    /// Called by [`BufferAllocator`](crate::BufferAllocator).
    pub(crate) fn new(
        pool: Arc<BufferPool>,
        region: Region,
        strategy: Strategy,
        capacity: usize,
        max_capacity: usize,
        growable: bool,
        writer: usize,
    ) -> Self {
        debug_assert!(capacity <= region.len());
        debug_assert!(capacity == 0 || !region.is_empty());
        debug_assert!(writer <= capacity);

        let leak_detection = pool.leak_detection();
        pool.stats().allocations.fetch_add(1, Ordering::Relaxed);

        Self {
            region,
            reader: 0,
            writer,
            capacity,
            max_capacity,
            growable,
            strategy,
            released: false,
            signal: ReleaseSignal::new(),
            leak_detection,
            allocation: leak_detection.capture(),
            pool,
        }
    }

    /// Panic if the buffer has been released.
    #[inline]
    #[track_caller]
    pub(crate) fn assert_live(&self) {
        assert!(!self.released, "buffer already released");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release this buffer and return its memory to the pool.
    ///
    /// # Panics
    /// Panics with "already released" if the buffer was released before.
    /// Every further call panics the same way.
    #[track_caller]
    pub fn release(&mut self) {
        assert!(!self.released, "already released: {:?}", self);
        self.released = true;

        // A zero-size sentinel has nothing to return; checkin discards it.
        let region = std::mem::replace(&mut self.region, Region::Empty);
        self.pool.checkin(region);
        self.pool.stats().releases.fetch_add(1, Ordering::Relaxed);

        self.signal.complete();
    }

    /// Whether [`release`](Self::release) has been called.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Handle that completes when this buffer is released.
    pub fn release_signal(&self) -> ReleaseSignal {
        self.signal.clone()
    }

    // ========================================================================
    // Capacity
    // ========================================================================

    /// Set the capacity of this buffer.
    ///
    /// Content up to `min(old, new)` capacity is preserved and cursors are
    /// clamped to the new capacity.
    ///
    /// Returns false, leaving the buffer untouched, if `new_capacity`
    /// exceeds [`max_capacity`](Self::max_capacity).
    pub fn set_capacity(&mut self, new_capacity: usize) -> bool {
        self.assert_live();
        tracing::debug!(
            "set_capacity: {} -> {}, max={}",
            self.capacity,
            new_capacity,
            self.max_capacity
        );

        if new_capacity > self.max_capacity {
            return false;
        }

        if new_capacity > self.region.len() {
            let mut region = self.pool.checkout(self.strategy, new_capacity);
            let keep = self.capacity.min(new_capacity);
            region.as_mut_slice()[..keep].copy_from_slice(&self.region.as_slice()[..keep]);
            let old = std::mem::replace(&mut self.region, region);
            self.pool.checkin(old);
            self.pool.stats().resizes.fetch_add(1, Ordering::Relaxed);
        } else if new_capacity > self.capacity {
            // Regrowing inside the current region exposes stale bytes.
            self.region.as_mut_slice()[self.capacity..new_capacity].fill(0);
        }

        self.capacity = new_capacity;
        self.writer = self.writer.min(new_capacity);
        self.reader = self.reader.min(self.writer);
        true
    }

    /// Make room for `additional` more bytes after the write cursor.
    ///
    /// Growable buffers grow to a power of two (then in fixed steps past
    /// the growth threshold).
    ///
    /// # Errors
    /// `Error::InsufficientCapacity` if the write would pass the maximum.
    pub fn ensure_writable(&mut self, additional: usize) -> Result<()> {
        self.assert_live();
        let required = self
            .writer
            .checked_add(additional)
            .ok_or(Error::InsufficientCapacity {
                required: usize::MAX,
                max: self.max_capacity,
            })?;

        if required <= self.capacity {
            return Ok(());
        }
        if required > self.max_capacity {
            return Err(Error::InsufficientCapacity {
                required,
                max: self.max_capacity,
            });
        }

        let resized = self.set_capacity(next_capacity(required, self.max_capacity));
        debug_assert!(resized);
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.assert_live();
        self.capacity
    }

    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.assert_live();
        self.max_capacity
    }

    /// Whether the buffer was allocated growable.
    #[inline]
    pub fn is_growable(&self) -> bool {
        self.assert_live();
        self.growable
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    // ========================================================================
    // Cursors and reads
    // ========================================================================

    #[inline]
    pub fn reader_index(&self) -> usize {
        self.assert_live();
        self.reader
    }

    #[inline]
    pub fn writer_index(&self) -> usize {
        self.assert_live();
        self.writer
    }

    /// Number of bytes between the read and write cursors.
    #[inline]
    pub fn readable_bytes(&self) -> usize {
        self.assert_live();
        self.writer - self.reader
    }

    /// Number of bytes that fit before the current capacity.
    #[inline]
    pub fn writable_bytes(&self) -> usize {
        self.assert_live();
        self.capacity - self.writer
    }

    /// Reset both cursors to zero. Content is not erased.
    pub fn clear(&mut self) {
        self.assert_live();
        self.reader = 0;
        self.writer = 0;
    }

    /// The unread bytes.
    #[inline]
    fn unread(&self) -> &[u8] {
        &self.region.as_slice()[self.reader..self.writer]
    }

    /// Immutable view of the unread region, for native buffer APIs.
    pub fn as_read_only_view(&self) -> ReadOnlyView<'_> {
        self.assert_live();
        ReadOnlyView {
            bytes: self.unread(),
        }
    }

    /// Copy out the unread region and advance the read cursor to the end.
    pub fn drain_to_vec(&mut self) -> Vec<u8> {
        self.assert_live();
        let bytes = self.unread().to_vec();
        self.reader = self.writer;
        bytes
    }

    /// Does the unread content of this buffer start with `prefix`'s?
    ///
    /// Neither buffer's cursors move.
    pub fn starts_with(&self, prefix: &ManagedBuffer) -> bool {
        self.assert_live();
        prefix.assert_live();

        let expected = prefix.unread();
        if self.readable_bytes() < expected.len() {
            return false;
        }
        &self.unread()[..expected.len()] == expected
    }

    /// A reader over the unread region that leaves this buffer's cursors
    /// alone.
    pub fn reader(&self) -> impl std::io::Read + '_ {
        self.assert_live();
        self.unread()
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.released {
            return write!(f, "ManagedBuffer[released]");
        }
        let unread = self.unread();
        let shown = &unread[..unread.len().min(PREVIEW_BYTES)];
        write!(
            f,
            "ManagedBuffer[{}<={}<={}: {}{}]",
            self.reader,
            self.writer,
            self.capacity,
            hex::encode(shown),
            if unread.len() > PREVIEW_BYTES { "..." } else { "" }
        )
    }
}

impl fmt::Display for ManagedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_summary(f)
    }
}

impl fmt::Debug for ManagedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_summary(f)
    }
}

impl Drop for ManagedBuffer {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Shrinking to zero capacity keeps the region, which still leaks.
        let leaked = !self.region.is_empty() && self.leak_detection.is_enabled();
        let summary = leaked.then(|| self.to_string());

        self.released = true;
        let region = std::mem::replace(&mut self.region, Region::Empty);
        self.pool.checkin(region);
        self.signal.complete();

        let Some(summary) = summary else {
            return;
        };

        let leak = self.pool.stats().leaks.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.allocation {
            Some(trace) => tracing::warn!(
                "LEAK {}: {}, capacity={} allocation:\n{}",
                leak,
                summary,
                self.capacity,
                trace
            ),
            None => tracing::warn!("LEAK {}: {}, capacity={}", leak, summary, self.capacity),
        }

        if self.leak_detection == LeakDetection::Strict && !std::thread::panicking() {
            panic!("buffer dropped without release: {}", summary);
        }
    }
}

/// Borrowed, read-only view of a buffer's unread bytes.
///
/// Dereferences to `[u8]`. The pointer from [`as_ptr`](Self::as_ptr) stays
/// valid for the lifetime of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOnlyView<'a> {
    bytes: &'a [u8],
}

impl<'a> ReadOnlyView<'a> {
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }
}

impl Deref for ReadOnlyView<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl AsRef<[u8]> for ReadOnlyView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferAllocator, BufferConfig};
    use std::io::Read;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use tracing_test::traced_test;

    fn tracking_allocator() -> BufferAllocator {
        BufferAllocator::with_config(
            BufferConfig::default().with_leak_detection(LeakDetection::Track),
        )
    }

    #[test]
    fn test_new_buffer_cursors() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(32);

        assert_eq!(buffer.reader_index(), 0);
        assert_eq!(buffer.writer_index(), 0);
        assert_eq!(buffer.capacity(), 32);
        assert_eq!(buffer.max_capacity(), 32);
        assert!(!buffer.is_growable());
        assert!(!buffer.is_released());

        buffer.release();
    }

    #[test]
    fn test_release_returns_region() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_direct(100);
        let signal = buffer.release_signal();

        buffer.release();

        assert!(buffer.is_released());
        assert!(signal.is_released());
        assert_eq!(allocator.idle_regions(), 1);
        assert_eq!(allocator.stats().snapshot().releases, 1);
    }

    #[test]
    #[should_panic(expected = "already released")]
    fn test_double_release_panics() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.release();
        buffer.release();
    }

    #[test]
    fn test_double_release_reported_every_time() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.release();

        for _ in 0..2 {
            let result = catch_unwind(AssertUnwindSafe(|| buffer.release()));
            assert!(result.is_err());
        }
        // Only the first release reached the pool
        assert_eq!(allocator.stats().snapshot().releases, 1);
    }

    #[test]
    #[should_panic(expected = "buffer already released")]
    fn test_use_after_release_panics() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.release();
        let _ = buffer.put_u8(1);
    }

    #[test]
    #[should_panic(expected = "buffer already released")]
    fn test_readable_bytes_after_release_panics() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(16);
        buffer.put_u32(4).unwrap();
        buffer.release();
        let _ = buffer.readable_bytes();
    }

    #[test]
    fn test_accessors_after_release_panic() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(16);
        buffer.release();

        assert!(catch_unwind(AssertUnwindSafe(|| buffer.capacity())).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| buffer.max_capacity())).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| buffer.reader_index())).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| buffer.writer_index())).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| buffer.writable_bytes())).is_err());
        assert!(catch_unwind(AssertUnwindSafe(|| buffer.is_growable())).is_err());
    }

    #[test]
    fn test_zero_capacity_release() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(0);
        assert_eq!(buffer.capacity(), 0);

        buffer.release();

        assert_eq!(allocator.idle_regions(), 0);
        assert_eq!(allocator.stats().snapshot().pool_misses, 0);
    }

    #[test]
    fn test_set_capacity_grows_preserving_content() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(-4);
        buffer.put_slice(&[1, 2, 3, 4]).unwrap();

        assert!(buffer.set_capacity(crate::buffer::next_power_of_two(10)));

        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.as_read_only_view().as_slice(), &[1, 2, 3, 4]);
        buffer.release();
    }

    #[test]
    fn test_set_capacity_beyond_max_fails() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.put_u32(5).unwrap();

        assert!(!buffer.set_capacity(9));

        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.readable_bytes(), 4);
        buffer.release();
    }

    #[test]
    fn test_set_capacity_shrink_clamps_cursors() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.put_u64(0x0102_0304_0506_0708).unwrap();

        assert!(buffer.set_capacity(3));

        assert_eq!(buffer.writer_index(), 3);
        assert_eq!(buffer.drain_to_vec(), vec![1, 2, 3]);

        // An exact buffer may grow back up to its original size
        assert!(buffer.set_capacity(8));
        assert!(!buffer.set_capacity(9));
        buffer.release();
    }

    #[test]
    fn test_shrunk_exact_buffer_stays_exact() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        assert!(!buffer.is_growable());

        assert!(buffer.set_capacity(3));

        assert!(!buffer.is_growable());
        buffer.release();

        let mut growable = allocator.allocate_heap(-8);
        assert!(growable.set_capacity(3));
        assert!(growable.is_growable());
        growable.release();
    }

    #[test]
    fn test_regrow_in_place_zeroes_tail() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.put_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        assert!(buffer.set_capacity(3));
        assert!(buffer.set_capacity(8));

        let mut seen = Vec::new();
        buffer.put_with(|dst| {
            seen.extend_from_slice(dst);
            0
        });
        assert_eq!(seen, vec![0; 5]);
        assert_eq!(buffer.drain_to_vec(), vec![1, 2, 3]);
        buffer.release();
    }

    #[test]
    fn test_resize_counted() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(-64);

        // Fits in the 64-byte region: no move
        assert!(buffer.set_capacity(32));
        assert_eq!(allocator.stats().snapshot().resizes, 0);

        assert!(buffer.set_capacity(1000));
        assert_eq!(allocator.stats().snapshot().resizes, 1);
        buffer.release();
    }

    #[test]
    fn test_ensure_writable_exact_buffer() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(4);

        assert!(buffer.ensure_writable(4).is_ok());
        match buffer.ensure_writable(5) {
            Err(Error::InsufficientCapacity { required, max }) => {
                assert_eq!(required, 5);
                assert_eq!(max, 4);
            }
            other => panic!("Expected InsufficientCapacity, got {:?}", other),
        }
        buffer.release();
    }

    #[test]
    fn test_drain_round_trip() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(-2);
        let bytes = b"hello, codec".to_vec();

        buffer.put_slice(&bytes).unwrap();
        assert_eq!(buffer.drain_to_vec(), bytes);
        assert_eq!(buffer.readable_bytes(), 0);
        buffer.release();
    }

    #[test]
    fn test_starts_with() {
        let allocator = BufferAllocator::new();
        let mut x = allocator.allocate_heap(-8);
        let mut y = allocator.allocate_heap(-8);
        let mut z = allocator.allocate_heap(-8);

        x.put_slice(b"key").unwrap().put_slice(b"value").unwrap();
        y.put_slice(b"key").unwrap();
        z.put_slice(b"keyx").unwrap();

        assert!(x.starts_with(&y));
        assert!(!x.starts_with(&z));
        assert!(!y.starts_with(&x));

        // Cursors untouched
        assert_eq!(x.readable_bytes(), 8);
        assert_eq!(y.readable_bytes(), 3);

        x.release();
        y.release();
        z.release();
    }

    #[test]
    fn test_reader_does_not_move_cursor() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(8);
        buffer.put_slice(b"abc").unwrap();

        let mut out = String::new();
        buffer.reader().read_to_string(&mut out).unwrap();

        assert_eq!(out, "abc");
        assert_eq!(buffer.readable_bytes(), 3);
        buffer.release();
    }

    #[test]
    fn test_display() {
        let allocator = BufferAllocator::new();
        let mut buffer = allocator.allocate_heap(16);
        buffer.put_slice(&[0xAB, 0xCD]).unwrap();

        assert_eq!(format!("{}", buffer), "ManagedBuffer[0<=2<=16: abcd]");

        buffer.put_slice(&[0; 10]).unwrap();
        assert!(format!("{}", buffer).ends_with("...]"));

        buffer.release();
        assert_eq!(format!("{:?}", buffer), "ManagedBuffer[released]");
    }

    #[test]
    fn test_drop_without_release_reclaims_silently() {
        let allocator = BufferAllocator::new();
        {
            let mut buffer = allocator.allocate_heap(64);
            buffer.put_u8(1).unwrap();
        }

        assert_eq!(allocator.leak_count(), 0);
        assert_eq!(allocator.idle_regions(), 1);
        allocator.assert_no_leaks();
    }

    #[test]
    #[traced_test]
    fn test_leak_logged_with_allocation_site() {
        let allocator = tracking_allocator();
        let signal = {
            let mut buffer = allocator.allocate_heap(-16);
            buffer.put_slice(&[1, 2, 3, 4, 5]).unwrap();
            buffer.release_signal()
        };

        assert!(signal.is_released());
        assert_eq!(allocator.leak_count(), 1);
        assert!(logs_contain("LEAK 1"));
        assert!(logs_contain("allocation:"));
    }

    #[test]
    fn test_shrunk_to_zero_drop_is_a_leak() {
        let allocator = tracking_allocator();
        {
            let mut buffer = allocator.allocate_heap(-16);
            buffer.put_u8(1).unwrap();
            assert!(buffer.set_capacity(0));
        }

        assert_eq!(allocator.leak_count(), 1);
        assert_eq!(allocator.idle_regions(), 1);
    }

    #[test]
    fn test_zero_capacity_drop_not_a_leak() {
        let allocator = tracking_allocator();
        drop(allocator.allocate_heap(0));

        assert_eq!(allocator.leak_count(), 0);
    }

    #[test]
    fn test_released_buffer_not_a_leak() {
        let allocator = tracking_allocator();
        let mut buffer = allocator.allocate_direct(32);
        buffer.release();
        drop(buffer);

        allocator.assert_no_leaks();
    }

    #[test]
    #[should_panic(expected = "buffer dropped without release")]
    fn test_strict_mode_panics_on_drop() {
        let allocator = BufferAllocator::with_config(
            BufferConfig::default().with_leak_detection(LeakDetection::Strict),
        );
        let _buffer = allocator.allocate_heap(8);
    }
}
