//! Write surface of [`ManagedBuffer`].
//!
//! Codecs produce buffer content through two kinds of writes:
//! - Fixed-width and slice writes, which grow the buffer when allowed
//! - Callback writes, where an external producer fills the buffer's
//!   memory directly and reports how much it wrote
//!
//! Callback writes come in three shapes: [`put_with`](ManagedBuffer::put_with)
//! for sources that know their size fits, [`put_from_stream`](ManagedBuffer::put_from_stream)
//! for `std::io::Write`-shaped producers, and
//! [`put_from_source`](ManagedBuffer::put_from_source) for producers that
//! may have nothing to give or more than fits.

use std::io;

use bytes::Buf;

use crate::buffer::ManagedBuffer;
use crate::common::Result;

/// Outcome of a best-effort write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    /// Bytes the source reported.
    pub requested: usize,
    /// Bytes actually committed to the buffer.
    pub written: usize,
}

impl Committed {
    /// Whether the source had more bytes than the buffer could take.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.requested > self.written
    }

    /// Bytes that did not fit.
    #[inline]
    pub fn shortfall(&self) -> usize {
        self.requested - self.written
    }
}

impl ManagedBuffer {
    // ========================================================================
    // Fixed-width writes (big-endian)
    // ========================================================================

    /// Append one byte.
    pub fn put_u8(&mut self, n: u8) -> Result<&mut Self> {
        self.put_slice(&[n])
    }

    pub fn put_i16(&mut self, n: i16) -> Result<&mut Self> {
        self.put_slice(&n.to_be_bytes())
    }

    pub fn put_u16(&mut self, n: u16) -> Result<&mut Self> {
        self.put_slice(&n.to_be_bytes())
    }

    pub fn put_i32(&mut self, n: i32) -> Result<&mut Self> {
        self.put_slice(&n.to_be_bytes())
    }

    pub fn put_u32(&mut self, n: u32) -> Result<&mut Self> {
        self.put_slice(&n.to_be_bytes())
    }

    pub fn put_i64(&mut self, n: i64) -> Result<&mut Self> {
        self.put_slice(&n.to_be_bytes())
    }

    pub fn put_u64(&mut self, n: u64) -> Result<&mut Self> {
        self.put_slice(&n.to_be_bytes())
    }

    /// Append raw bytes.
    ///
    /// # Errors
    /// `Error::InsufficientCapacity` if the bytes cannot fit even after
    /// growing. Nothing is written in that case.
    pub fn put_slice(&mut self, src: &[u8]) -> Result<&mut Self> {
        self.assert_live();
        self.ensure_writable(src.len())?;

        let start = self.writer;
        self.region.as_mut_slice()[start..start + src.len()].copy_from_slice(src);
        self.writer += src.len();
        Ok(self)
    }

    /// Copy all remaining bytes of `src` into this buffer, consuming them.
    pub fn put_buf<B: Buf>(&mut self, src: &mut B) -> Result<&mut Self> {
        self.assert_live();
        self.ensure_writable(src.remaining())?;

        let mut position = self.writer;
        while src.has_remaining() {
            let chunk = src.chunk();
            let len = chunk.len();
            self.region.as_mut_slice()[position..position + len].copy_from_slice(chunk);
            src.advance(len);
            position += len;
        }
        self.writer = position;
        Ok(self)
    }

    // ========================================================================
    // Callback writes
    // ========================================================================

    /// Let `source` fill the writable region directly.
    ///
    /// `source` receives `[writer, capacity)` and returns how many bytes it
    /// wrote from the start of that slice (0 is allowed). The buffer does not
    /// grow; call [`ensure_writable`](Self::ensure_writable) first if the
    /// source might not fit.
    ///
    /// # Panics
    /// Panics if `source` reports more bytes than it was given.
    pub fn put_with<F>(&mut self, source: F) -> &mut Self
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        self.assert_live();
        let start = self.writer;
        let capacity = self.capacity;

        let size = source(&mut self.region.as_mut_slice()[start..capacity]);
        assert!(
            size <= capacity - start,
            "source wrote {} bytes into a {} byte region",
            size,
            capacity - start
        );

        self.writer = start + size;
        self
    }

    /// Let `source` write through a [`StreamWriter`] and report a size.
    ///
    /// The writer appends (growing the buffer if allowed). When `source`
    /// returns `Ok(size)`, the write cursor is set to its pre-call position
    /// plus `size`. When it fails, the write cursor goes back to where it
    /// was and the error is returned.
    ///
    /// # Panics
    /// Panics if the reported size reaches past the buffer's capacity.
    pub fn put_from_stream<F>(&mut self, source: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut StreamWriter<'_>) -> io::Result<usize>,
    {
        self.assert_live();
        let start = self.writer;

        let result = {
            let mut out = StreamWriter {
                buffer: &mut *self,
                start,
            };
            source(&mut out)
        };

        match result {
            Ok(size) => {
                let end = start.checked_add(size).filter(|&end| end <= self.capacity);
                let Some(end) = end else {
                    panic!(
                        "source reported {} bytes but only {} fit after position {}",
                        size,
                        self.capacity - start,
                        start
                    );
                };
                self.writer = end;
                Ok(self)
            }
            Err(e) => {
                self.writer = start;
                Err(e.into())
            }
        }
    }

    /// Let a source that may be unavailable fill the writable region.
    ///
    /// `source` returns `Ok(None)` when it has nothing to offer (the buffer
    /// is untouched), or `Ok(Some(n))` with the size it needed. If `n` is
    /// larger than the writable region, only the region's worth is
    /// committed; compare [`Committed::requested`] with
    /// [`Committed::written`] to grow and retry.
    ///
    /// # Errors
    /// Errors from `source` are returned as-is with cursors untouched.
    pub fn put_from_source<F, E>(&mut self, source: F) -> std::result::Result<Option<Committed>, E>
    where
        F: FnOnce(&mut [u8]) -> std::result::Result<Option<usize>, E>,
    {
        self.assert_live();
        let start = self.writer;
        let capacity = self.capacity;

        let Some(requested) = source(&mut self.region.as_mut_slice()[start..capacity])? else {
            return Ok(None);
        };

        let written = requested.min(capacity - start);
        if written < requested {
            tracing::debug!(
                "partial write: source needs {} bytes, {} writable",
                requested,
                written
            );
        }
        self.writer = start + written;
        Ok(Some(Committed { requested, written }))
    }
}

/// `std::io::Write` adapter handed to [`ManagedBuffer::put_from_stream`].
///
/// Each write appends at the write cursor, growing the buffer when it is
/// allowed to.
pub struct StreamWriter<'a> {
    buffer: &'a mut ManagedBuffer,
    start: usize,
}

impl StreamWriter<'_> {
    /// Bytes written through this adapter so far.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.buffer.writer - self.start
    }
}

impl io::Write for StreamWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.put_slice(buf).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
