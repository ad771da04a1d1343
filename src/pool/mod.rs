//! Memory pooling for buffer backing regions.
//!
//! # Components
//! - `BufferPool` - Free lists of idle regions per strategy and size class
//! - `Region` - One block of heap or direct memory
//! - [`PoolStats`] - Allocation and leak statistics

mod buffer_pool;
mod region;
mod stats;

pub(crate) use buffer_pool::BufferPool;
pub(crate) use region::Region;
pub use stats::{PoolStats, StatsSnapshot};
