//! Common types and utilities shared across codecbuf.
//!
//! This module contains fundamental primitives used throughout the crate:
//! - Configuration constants and [`BufferConfig`](config::BufferConfig)
//! - Error types
//! - Allocation strategy and size requests

pub mod config;
mod size;

pub use config::BufferConfig;
pub use crate::error::{Error, Result};
pub use size::{SizeRequest, Strategy};
