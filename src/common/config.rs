//! Configuration for codecbuf.
//!
//! Fixed tuning constants live here alongside [`BufferConfig`], the
//! configuration object handed to a [`BufferAllocator`](crate::BufferAllocator).

use crate::buffer::LeakDetection;

/// Alignment of direct regions in bytes.
///
/// Matches the OS page size on most systems so direct regions can be
/// handed to native APIs that expect page-aligned memory.
pub const DIRECT_ALIGNMENT: usize = 4096;

/// Smallest region the pool hands out. Smaller requests share this class.
pub const MIN_REGION_SIZE: usize = 64;

/// Largest capacity any buffer may have.
///
/// Allocations in Rust are limited to `isize::MAX` bytes, so this is the
/// ceiling of a growable buffer and the saturation point of capacity
/// rounding.
pub const MAX_CAPACITY: usize = isize::MAX as usize;

/// Above this size, growth switches from doubling to fixed steps.
pub const GROWTH_THRESHOLD: usize = 4 * 1024 * 1024;

/// Regions larger than this are never kept in the pool.
pub const DEFAULT_MAX_POOLED_SIZE: usize = 16 * 1024 * 1024;

/// Number of idle regions kept per size class.
pub const DEFAULT_MAX_POOLED_PER_CLASS: usize = 64;

/// Environment variable read by [`BufferConfig::from_env`].
pub const LEAK_DETECTION_ENV: &str = "CODECBUF_LEAK_DETECTION";

/// Settings for a [`BufferAllocator`](crate::BufferAllocator) and its pool.
///
/// # Example
/// ```
/// use codecbuf::{BufferConfig, LeakDetection};
///
/// let config = BufferConfig::default()
///     .with_leak_detection(LeakDetection::Track)
///     .with_max_pooled_per_class(8);
/// assert_eq!(config.leak_detection, LeakDetection::Track);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// What happens when a buffer is dropped without being released.
    pub leak_detection: LeakDetection,
    /// Largest region size returned to the pool on release.
    pub max_pooled_size: usize,
    /// Maximum idle regions per (strategy, size class).
    pub max_pooled_per_class: usize,
}

impl BufferConfig {
    /// Build a config from defaults, overriding leak detection from
    /// `CODECBUF_LEAK_DETECTION` when it is set to a recognized value.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(LEAK_DETECTION_ENV) {
            match value.parse() {
                Ok(mode) => config.leak_detection = mode,
                Err(e) => tracing::warn!("ignoring {}: {}", LEAK_DETECTION_ENV, e),
            }
        }
        config
    }

    pub fn with_leak_detection(mut self, mode: LeakDetection) -> Self {
        self.leak_detection = mode;
        self
    }

    pub fn with_max_pooled_size(mut self, size: usize) -> Self {
        self.max_pooled_size = size;
        self
    }

    pub fn with_max_pooled_per_class(mut self, count: usize) -> Self {
        self.max_pooled_per_class = count;
        self
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            leak_detection: LeakDetection::Disabled,
            max_pooled_size: DEFAULT_MAX_POOLED_SIZE,
            max_pooled_per_class: DEFAULT_MAX_POOLED_PER_CLASS,
        }
    }
}
