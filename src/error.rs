//! Error types for codecbuf.
//!
//! Only recoverable conditions are represented here. Misuse of a buffer
//! (touching it after release, releasing it twice, a write callback
//! claiming more bytes than it was given) is a bug in the caller and panics
//! instead.

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors raised by buffer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied source failed while writing into a buffer.
    ///
    /// The buffer's cursors are left where they were before the call.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write needs more room than the buffer may ever hold.
    ///
    /// Exact-size buffers hit this as soon as they are full; growable
    /// buffers only when `required` exceeds their maximum capacity.
    #[error("insufficient capacity: required {required} bytes, max {max}")]
    InsufficientCapacity { required: usize, max: usize },
}
