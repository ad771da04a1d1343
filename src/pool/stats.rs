//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the buffer pool.
///
/// All fields are atomic for lock-free, thread-safe updates.
///
/// # Memory Ordering
/// Counters are independent of each other and only need atomicity, so
/// `Ordering::Relaxed` is enough. `leaks` is the exception: it is updated and
/// read with `SeqCst` by the leak detector and
/// [`assert_no_leaks`](crate::BufferAllocator::assert_no_leaks).
///
/// # Example
/// ```
/// use codecbuf::PoolStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = PoolStats::new();
/// stats.pool_hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().pool_hits, 1);
/// ```
#[derive(Debug)]
pub struct PoolStats {
    /// Buffers handed out by the allocator.
    pub allocations: AtomicU64,

    /// Regions served from an idle free list.
    pub pool_hits: AtomicU64,

    /// Regions that had to be freshly allocated.
    pub pool_misses: AtomicU64,

    /// Buffers released explicitly by their owner.
    pub releases: AtomicU64,

    /// Capacity changes that moved content into a new region.
    pub resizes: AtomicU64,

    /// Buffers dropped without release while leak detection was on.
    pub leaks: AtomicU64,
}

impl PoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            allocations: AtomicU64::new(0),
            pool_hits: AtomicU64::new(0),
            pool_misses: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            resizes: AtomicU64::new(0),
            leaks: AtomicU64::new(0),
        }
    }

    /// Fraction of region requests served from the pool (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Get a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.pool_misses.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            resizes: self.resizes.load(Ordering::Relaxed),
            leaks: self.leaks.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.allocations.store(0, Ordering::Relaxed);
        self.pool_hits.store(0, Ordering::Relaxed);
        self.pool_misses.store(0, Ordering::Relaxed);
        self.releases.store(0, Ordering::Relaxed);
        self.resizes.store(0, Ordering::Relaxed);
        self.leaks.store(0, Ordering::Relaxed);
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub allocations: u64,
    pub pool_hits: u64,
    pub pool_misses: u64,
    pub releases: u64,
    pub resizes: u64,
    pub leaks: u64,
}

impl StatsSnapshot {
    /// Fraction of region requests served from the pool (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.pool_hits + self.pool_misses;
        if total == 0 {
            0.0
        } else {
            self.pool_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ allocations: {}, releases: {}, resizes: {}, leaks: {}, hit_rate: {:.2}% }}",
            self.allocations,
            self.releases,
            self.resizes,
            self.leaks,
            self.hit_rate() * 100.0
        )
    }
}
