//! codecbuf - pooled, growable buffers for key-value codecs.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            codecbuf                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Codecs / storage engine (external)             │   │
//! │  │   put_* writes, callback writes, read-only views         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Managed buffers (buffer/)                 │   │
//! │  │   BufferAllocator → ManagedBuffer → release()            │   │
//! │  │   CapacityTracker   ReleaseSignal   LeakDetection        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                  Region pool (pool/)                     │   │
//! │  │     heap | direct regions by power-of-two size class     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (config, size requests)
//! - [`error`] - Recoverable error type
//! - [`buffer`] - Allocator, buffers, release signals, capacity tracking
//! - [`pool`] - Backing memory pool and statistics
//!
//! # Quick Start
//! ```
//! use codecbuf::{BufferAllocator, CapacityTracker};
//!
//! let allocator = BufferAllocator::new();
//! let tracker = CapacityTracker::new("values", 16);
//!
//! let mut buffer = allocator.allocate_direct(-(tracker.get() as i64));
//! buffer.put_i32(1)?.put_slice(b"value")?;
//! tracker.increase(buffer.readable_bytes());
//!
//! let view = buffer.as_read_only_view();
//! assert_eq!(&view[4..], b"value");
//!
//! buffer.release();
//! allocator.assert_no_leaks();
//! # Ok::<(), codecbuf::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod error;
pub mod pool;

// Re-export commonly used items at crate root for convenience
pub use buffer::{
    BufferAllocator, CapacityTracker, Committed, LeakDetection, ManagedBuffer, ReadOnlyView,
    ReleaseSignal, StreamWriter,
};
pub use common::{BufferConfig, Error, Result, SizeRequest, Strategy};
pub use pool::{PoolStats, StatsSnapshot};
