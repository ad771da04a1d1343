//! Buffer Pool - reusable regions keyed by strategy and size class.
//!
//! The [`BufferPool`] provides:
//! - Power-of-two size classes for heap and direct regions
//! - Bounded free lists so idle memory stays capped
//! - Statistics shared with every buffer checked out of it

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::buffer::LeakDetection;
use crate::common::config::MIN_REGION_SIZE;
use crate::common::{BufferConfig, Strategy};
use crate::pool::{PoolStats, Region};

/// Manages idle regions for reuse across buffers.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │                       BufferPool                         │
/// │  ┌────────────────────────────────────────────────────┐  │
/// │  │ free: (Strategy, class) → Vec<Region>              │  │
/// │  │  (Heap, 64)     [R] [R]                            │  │
/// │  │  (Direct, 4096) [R]                                │  │
/// │  └────────────────────────────────────────────────────┘  │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐    │
/// │  │    stats     │  │ leak_detect  │  │    limits    │    │
/// │  │  PoolStats   │  │   AtomicU8   │  │ BufferConfig │    │
/// │  └──────────────┘  └──────────────┘  └──────────────┘    │
/// └──────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `free`: `Mutex`, every check-out and check-in modifies it
/// - `leak_detection`: atomic, read once per allocation
/// - `stats`: No lock, all atomic counters
pub(crate) struct BufferPool {
    /// Idle regions, by strategy and power-of-two size.
    free: Mutex<HashMap<(Strategy, usize), Vec<Region>>>,

    /// Leak detection mode applied to newly allocated buffers.
    leak_detection: AtomicU8,

    /// Largest region size kept on check-in.
    max_pooled_size: usize,

    /// Idle regions kept per size class.
    max_pooled_per_class: usize,

    stats: PoolStats,
}

impl BufferPool {
    pub(crate) fn new(config: &BufferConfig) -> Self {
        Self {
            free: Mutex::new(HashMap::new()),
            leak_detection: AtomicU8::new(config.leak_detection.as_u8()),
            max_pooled_size: config.max_pooled_size,
            max_pooled_per_class: config.max_pooled_per_class,
            stats: PoolStats::new(),
        }
    }

    /// Size class a request of `len` bytes is served from.
    ///
    /// Returns `None` for sizes the pool does not keep.
    fn size_class(&self, len: usize) -> Option<usize> {
        let class = len.max(MIN_REGION_SIZE).checked_next_power_of_two()?;
        (class <= self.max_pooled_size).then_some(class)
    }

    // ========================================================================
    // Check-out / check-in
    // ========================================================================

    /// Take a zeroed region of at least `len` bytes.
    ///
    /// `len == 0` yields the empty sentinel without touching the pool.
    pub(crate) fn checkout(&self, strategy: Strategy, len: usize) -> Region {
        if len == 0 {
            return Region::Empty;
        }

        let Some(class) = self.size_class(len) else {
            // Too large to pool: allocate exactly what was asked for.
            self.stats.pool_misses.fetch_add(1, Ordering::Relaxed);
            return Region::allocate(strategy, len);
        };

        let reused = {
            let mut free = self.free.lock();
            free.get_mut(&(strategy, class)).and_then(Vec::pop)
        };

        match reused {
            Some(mut region) => {
                self.stats.pool_hits.fetch_add(1, Ordering::Relaxed);
                region.reset();
                tracing::trace!(%strategy, class, "reused pooled region");
                region
            }
            None => {
                self.stats.pool_misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(%strategy, class, "allocated new region");
                Region::allocate(strategy, class)
            }
        }
    }

    /// Return a region to its free list, or free it if it cannot be pooled.
    pub(crate) fn checkin(&self, region: Region) {
        let Some(strategy) = region.strategy() else {
            // Zero-size sentinel: nothing to return.
            return;
        };

        let len = region.len();
        if self.size_class(len) != Some(len) {
            tracing::trace!(%strategy, len, "discarding unpoolable region");
            return;
        }

        let mut free = self.free.lock();
        let list = free.entry((strategy, len)).or_default();
        if list.len() < self.max_pooled_per_class {
            list.push(region);
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub(crate) fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Number of idle regions across all classes.
    pub(crate) fn idle_regions(&self) -> usize {
        self.free.lock().values().map(Vec::len).sum()
    }

    pub(crate) fn leak_detection(&self) -> LeakDetection {
        LeakDetection::from_u8(self.leak_detection.load(Ordering::Acquire))
    }

    pub(crate) fn set_leak_detection(&self, mode: LeakDetection) {
        self.leak_detection.store(mode.as_u8(), Ordering::Release);
    }
}
