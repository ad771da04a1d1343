//! BufferAllocator - the entry point for obtaining buffers.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::buffer::{LeakDetection, ManagedBuffer};
use crate::common::{BufferConfig, SizeRequest, Strategy};
use crate::pool::{BufferPool, PoolStats, Region};

/// Hands out [`ManagedBuffer`]s backed by a shared pool.
///
/// Cloning is cheap: clones share the pool, its statistics, its leak
/// counter and its leak detection mode. Pass one allocator to whatever
/// constructs buffers instead of reaching for global state.
///
/// # Example
/// ```
/// use codecbuf::{BufferAllocator, Strategy};
///
/// let allocator = BufferAllocator::new();
///
/// // Exact size: capacity == max capacity == 8
/// let mut key = allocator.allocate(8, Strategy::Direct);
/// key.put_u64(42)?;
///
/// // Growable: starts at 16 bytes
/// let mut value = allocator.allocate(-16, Strategy::Heap);
/// value.put_slice(&[0u8; 100])?;
///
/// key.release();
/// value.release();
/// allocator.assert_no_leaks();
/// # Ok::<(), codecbuf::Error>(())
/// ```
#[derive(Clone)]
pub struct BufferAllocator {
    pool: Arc<BufferPool>,
}

impl BufferAllocator {
    /// Create an allocator with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BufferConfig::default())
    }

    pub fn with_config(config: BufferConfig) -> Self {
        if config.leak_detection.is_enabled() {
            tracing::info!("leak detection: {}", config.leak_detection);
        }
        Self {
            pool: Arc::new(BufferPool::new(&config)),
        }
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate a pooled buffer.
    ///
    /// `size` is either a [`SizeRequest`] or a signed integer: non-negative
    /// for an exact-size buffer, negative for a growable buffer whose
    /// initial capacity is the absolute value.
    pub fn allocate(&self, size: impl Into<SizeRequest>, strategy: Strategy) -> ManagedBuffer {
        let size = size.into();
        let region = self.pool.checkout(strategy, size.initial());
        ManagedBuffer::new(
            Arc::clone(&self.pool),
            region,
            strategy,
            size.initial(),
            size.max(),
            size.is_growable(),
            0,
        )
    }

    /// Allocate a pooled direct buffer.
    pub fn allocate_direct(&self, size: impl Into<SizeRequest>) -> ManagedBuffer {
        self.allocate(size, Strategy::Direct)
    }

    /// Allocate a pooled heap buffer.
    pub fn allocate_heap(&self, size: impl Into<SizeRequest>) -> ManagedBuffer {
        self.allocate(size, Strategy::Heap)
    }

    /// Wrap `bytes` as an exact-size heap buffer with all bytes readable.
    ///
    /// The vector is not pooled on release unless its length happens to be
    /// a pool size class.
    pub fn wrap(&self, bytes: Vec<u8>) -> ManagedBuffer {
        let len = bytes.len();
        ManagedBuffer::new(
            Arc::clone(&self.pool),
            Region::from_vec(bytes),
            Strategy::Heap,
            len,
            len,
            false,
            len,
        )
    }

    // ========================================================================
    // Leak detection
    // ========================================================================

    /// Turn on leak tracking for buffers allocated from now on.
    ///
    /// Capturing allocation sites has a severe performance cost.
    pub fn enable_leak_detection(&self) {
        self.set_leak_detection(LeakDetection::Track);
    }

    pub fn set_leak_detection(&self, mode: LeakDetection) {
        self.pool.set_leak_detection(mode);
        tracing::info!("leak detection: {}", mode);
    }

    pub fn leak_detection(&self) -> LeakDetection {
        self.pool.leak_detection()
    }

    /// Number of buffers dropped without release while tracked.
    pub fn leak_count(&self) -> u64 {
        self.pool.stats().leaks.load(Ordering::SeqCst)
    }

    /// Panic if any leak has been recorded.
    ///
    /// Meant for tests and harnesses.
    #[track_caller]
    pub fn assert_no_leaks(&self) {
        let leaks = self.leak_count();
        assert!(leaks == 0, "Found {} leaked buffers, check logs", leaks);
    }

    // ========================================================================
    // Stats
    // ========================================================================

    pub fn stats(&self) -> &PoolStats {
        self.pool.stats()
    }

    /// Number of idle regions waiting in the pool.
    pub fn idle_regions(&self) -> usize {
        self.pool.idle_regions()
    }
}

impl Default for BufferAllocator {
    fn default() -> Self {
        Self::new()
    }
}
