//! Managed buffers.
//!
//! # Components
//! - [`BufferAllocator`] - Picks heap or direct memory, exact or growable size
//! - [`ManagedBuffer`] - Cursor-based buffer with exactly-once release
//! - [`ReleaseSignal`] - Completion handle for a buffer's release
//! - [`CapacityTracker`] - Shared capacity hint for a class of buffers
//! - [`LeakDetection`] - What to do with buffers dropped unreleased

mod allocator;
mod capacity_tracker;
mod leak_detection;
mod managed_buffer;
mod release_signal;
mod write_adapters;

pub use allocator::BufferAllocator;
pub use capacity_tracker::{next_power_of_two, CapacityTracker};
pub use leak_detection::{LeakDetection, ParseLeakDetectionError};
pub use managed_buffer::{ManagedBuffer, ReadOnlyView};
pub use release_signal::ReleaseSignal;
pub use write_adapters::{Committed, StreamWriter};
