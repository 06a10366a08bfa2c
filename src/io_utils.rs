use std::io::prelude::*;

use crc32fast::Hasher;

use crate::{sink::ChunkSink, CodecError, CodecResult};

/// Writes every chunk it receives to an [`io::Write`](std::io::Write), counting bytes and
/// optionally computing a CRC32 of everything written.
///
/// Closing flushes the writer once; chunks added after that are rejected.
pub struct WriteSink<W> {
    inner: W,
    hasher: Option<Hasher>,
    count: u64,
    closed: bool,
}

impl<W> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self::with_hasher(inner, None)
    }

    /// Creates a sink that also computes a CRC32 of the written bytes.
    pub fn with_crc(inner: W) -> Self {
        Self::with_hasher(inner, Some(Hasher::new()))
    }

    pub fn with_hasher(inner: W, hasher: Option<Hasher>) -> Self {
        Self {
            inner,
            hasher,
            count: 0,
            closed: false,
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> u64 {
        self.count
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// CRC32 of everything written so far, or 0 if no checksum is being computed.
    pub fn current_checksum(&self) -> u32 {
        self.hasher
            .clone()
            .map(|hasher| hasher.finalize())
            .unwrap_or(0)
    }

    /// Consumes the sink and returns the inner writer and the hasher.
    pub fn finalize(self) -> (W, Option<Hasher>) {
        (self.inner, self.hasher)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ChunkSink for WriteSink<W> {
    fn add(&mut self, chunk: &[u8]) -> CodecResult<()> {
        if self.closed {
            return Err(CodecError::Closed);
        }
        self.inner.write_all(chunk)?;
        self.count += chunk.len() as u64;
        if let Some(hasher) = &mut self.hasher {
            hasher.update(chunk);
        }
        Ok(())
    }

    fn flush(&mut self) -> CodecResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    fn close(&mut self) -> CodecResult<()> {
        if !self.closed {
            self.inner.flush()?;
            self.closed = true;
        }
        Ok(())
    }
}
