//! Allocation strategy and size request types.

use std::fmt;

use super::config::MAX_CAPACITY;

/// Where a buffer's backing memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Ordinary heap memory.
    Heap,
    /// Page-aligned memory with a stable address, for native buffer APIs.
    Direct,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Heap => write!(f, "heap"),
            Strategy::Direct => write!(f, "direct"),
        }
    }
}

/// How much memory to allocate and whether the buffer may grow.
///
/// The signed integer conversions follow the usual codec convention:
/// a non-negative value asks for an exact-size buffer, a negative value asks
/// for a growable buffer starting at its absolute value.
///
/// # Example
/// ```
/// use codecbuf::SizeRequest;
///
/// assert_eq!(SizeRequest::from(16), SizeRequest::Exact(16));
/// assert_eq!(SizeRequest::from(-16), SizeRequest::Growable(16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRequest {
    /// Capacity and maximum capacity both equal to the given size.
    Exact(usize),
    /// Initial capacity of the given size, growable up to [`MAX_CAPACITY`].
    Growable(usize),
}

impl SizeRequest {
    /// Initial capacity of the buffer.
    #[inline]
    pub fn initial(&self) -> usize {
        match *self {
            SizeRequest::Exact(n) | SizeRequest::Growable(n) => n,
        }
    }

    #[inline]
    pub fn is_growable(&self) -> bool {
        matches!(self, SizeRequest::Growable(_))
    }

    /// Ceiling the buffer may grow to.
    #[inline]
    pub fn max(&self) -> usize {
        match *self {
            SizeRequest::Exact(n) => n,
            SizeRequest::Growable(_) => MAX_CAPACITY,
        }
    }
}

impl From<i32> for SizeRequest {
    fn from(capacity: i32) -> Self {
        if capacity >= 0 {
            SizeRequest::Exact(capacity as usize)
        } else {
            SizeRequest::Growable(capacity.unsigned_abs() as usize)
        }
    }
}

impl From<i64> for SizeRequest {
    fn from(capacity: i64) -> Self {
        let magnitude = usize::try_from(capacity.unsigned_abs()).unwrap_or(MAX_CAPACITY);
        if capacity >= 0 {
            SizeRequest::Exact(magnitude.min(MAX_CAPACITY))
        } else {
            SizeRequest::Growable(magnitude.min(MAX_CAPACITY))
        }
    }
}

impl From<usize> for SizeRequest {
    fn from(capacity: usize) -> Self {
        SizeRequest::Exact(capacity)
    }
}
