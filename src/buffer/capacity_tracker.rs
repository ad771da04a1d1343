//! Capacity sizing shared across buffers.
//!
//! A [`CapacityTracker`] remembers how large buffers of one logical class
//! have needed to be, so the next allocation can start there instead of
//! growing again.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::config::{GROWTH_THRESHOLD, MAX_CAPACITY, MIN_REGION_SIZE};

/// Smallest power of two `>= n`, saturating at [`MAX_CAPACITY`].
///
/// # Example
/// ```
/// use codecbuf::buffer::next_power_of_two;
///
/// assert_eq!(next_power_of_two(10), 16);
/// assert_eq!(next_power_of_two(16), 16);
/// ```
#[inline]
pub fn next_power_of_two(n: usize) -> usize {
    n.checked_next_power_of_two()
        .unwrap_or(MAX_CAPACITY)
        .min(MAX_CAPACITY)
}

/// Capacity to grow to when at least `min` bytes are needed.
///
/// Doubles from [`MIN_REGION_SIZE`] up to [`GROWTH_THRESHOLD`], then grows
/// in threshold-sized steps. Never exceeds `max`.
pub(crate) fn next_capacity(min: usize, max: usize) -> usize {
    if min == GROWTH_THRESHOLD {
        return GROWTH_THRESHOLD.min(max);
    }
    if min > GROWTH_THRESHOLD {
        let stepped = min / GROWTH_THRESHOLD * GROWTH_THRESHOLD;
        return if stepped > max.saturating_sub(GROWTH_THRESHOLD) {
            max
        } else {
            stepped + GROWTH_THRESHOLD
        };
    }
    next_power_of_two(min).max(MIN_REGION_SIZE).min(max)
}

/// A named, monotonically increasing capacity hint.
///
/// # Thread Safety
/// `increase` is a single atomic read-modify-write, so concurrent callers
/// never lose an update: the final value is at least the rounding of the
/// largest `required` ever submitted.
///
/// # Example
/// ```
/// use codecbuf::CapacityTracker;
///
/// let tracker = CapacityTracker::new("keys", 0);
/// tracker.increase(10);
/// tracker.increase(11);
/// tracker.increase(500);
/// assert_eq!(tracker.get(), 512);
/// ```
#[derive(Debug)]
pub struct CapacityTracker {
    name: String,
    value: AtomicUsize,
}

impl CapacityTracker {
    pub fn new(name: impl Into<String>, initial: usize) -> Self {
        Self {
            name: name.into(),
            value: AtomicUsize::new(initial),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    /// Raise the tracked value to accommodate `required` bytes.
    ///
    /// Leaves the value untouched if it already covers `required`; otherwise
    /// stores the next power of two. Returns the value after the update.
    pub fn increase(&self, required: usize) -> usize {
        let next = next_power_of_two(required);
        match self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (required > current).then_some(next)
            }) {
            Ok(previous) => {
                tracing::info!("{}: increase {} -> {}", self.name, previous, next);
                next
            }
            Err(current) => current,
        }
    }
}
