use alloc::vec::Vec;

use crate::error::{Error, Result};

/// A contiguous, growable byte buffer backing one socket's receive (or, for
/// the brief window between `send` and the transport's "sent" callback,
/// transmit) side.
///
/// Models the original's `rxBuf`/`rxBufLen` pair: a single heap allocation
/// that is grown with a realloc-equivalent on each append and shrunk with a
/// memmove-equivalent on each partial drain. Growth is fallible — on
/// allocation failure the caller is expected to drop the bytes and move the
/// owning slot to `ERROR` (see [`crate::mux::Multiplexer`]).
#[derive(Debug, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append `bytes` to the tail of the buffer, growing it first.
    ///
    /// Returns `Err(Error::Exhausted)` without mutating the buffer if the
    /// growth allocation fails.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.data
            .try_reserve(bytes.len())
            .map_err(|_| Error::Exhausted)?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Copy up to `out.len()` bytes out of the buffer into `out`, in FIFO
    /// order, removing them from the buffer (shifting any remainder down).
    ///
    /// Returns the number of bytes copied.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = core::cmp::min(self.data.len(), out.len());
        out[..n].copy_from_slice(&self.data[..n]);
        self.data.drain(..n);
        n
    }
}
