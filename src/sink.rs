//! Consumers of chunked byte streams.
use std::io;

use crate::{
    codec::Codec,
    filter::{Filter, FilterState},
    CodecError, CodecResult, FilterOptions,
};

/// Something that accepts a stream of byte chunks and is closed exactly once at the end.
pub trait ChunkSink {
    /// Accepts the next chunk. The chunk is only borrowed for the duration of the call.
    fn add(&mut self, chunk: &[u8]) -> CodecResult<()>;

    /// Pushes anything retained so far further down the chain.
    fn flush(&mut self) -> CodecResult<()> {
        Ok(())
    }

    /// Ends the stream. Further chunks must not be added.
    fn close(&mut self) -> CodecResult<()>;
}

impl<S: ChunkSink + ?Sized> ChunkSink for &mut S {
    fn add(&mut self, chunk: &[u8]) -> CodecResult<()> {
        (**self).add(chunk)
    }

    fn flush(&mut self) -> CodecResult<()> {
        (**self).flush()
    }

    fn close(&mut self) -> CodecResult<()> {
        (**self).close()
    }
}

impl<S: ChunkSink + ?Sized> ChunkSink for Box<S> {
    fn add(&mut self, chunk: &[u8]) -> CodecResult<()> {
        (**self).add(chunk)
    }

    fn flush(&mut self) -> CodecResult<()> {
        (**self).flush()
    }

    fn close(&mut self) -> CodecResult<()> {
        (**self).close()
    }
}

/// Gathers everything it receives into one contiguous `Vec<u8>`.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    bytes: Vec<u8>,
    chunks: usize,
    closed: bool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// How many non-empty chunks were added.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ChunkSink for CollectingSink {
    fn add(&mut self, chunk: &[u8]) -> CodecResult<()> {
        if self.closed {
            return Err(CodecError::Closed);
        }
        if !chunk.is_empty() {
            self.bytes.extend_from_slice(chunk);
            self.chunks += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> CodecResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// A sink that runs every chunk through a codec before handing the result to `downstream`.
///
/// Closing a `CodecSink` finishes the codec and then closes the downstream sink exactly once.
/// If the codec fails, the downstream sink is left open and the error is returned instead.
///
/// `CodecSink` also implements [`io::Write`], so it can sit at the end of `io::copy` or any
/// other writer chain. Writers have no notion of closing, so call [`CodecSink::close`]
/// explicitly once done.
pub struct CodecSink<C: Codec, D: ChunkSink> {
    filter: Filter<C>,
    downstream: D,
    closed: bool,
}

impl<C: Codec, D: ChunkSink> CodecSink<C, D> {
    pub fn new(codec: C, downstream: D) -> CodecResult<Self> {
        Self::with_options(codec, FilterOptions::default(), downstream)
    }

    pub fn with_options(codec: C, options: FilterOptions, downstream: D) -> CodecResult<Self> {
        Ok(Self::from_filter(
            Filter::with_options(codec, options)?,
            downstream,
        ))
    }

    pub fn from_filter(filter: Filter<C>, downstream: D) -> Self {
        Self {
            filter,
            downstream,
            closed: false,
        }
    }

    pub fn add(&mut self, chunk: &[u8]) -> CodecResult<()> {
        if self.closed {
            return Err(CodecError::Closed);
        }
        self.filter.process(chunk, &mut self.downstream)
    }

    /// Flushes the codec, then the downstream sink.
    pub fn flush(&mut self) -> CodecResult<()> {
        if self.closed {
            return Err(CodecError::Closed);
        }
        self.filter.flush(&mut self.downstream)?;
        self.downstream.flush()
    }

    /// Finishes the codec and closes the downstream sink. Calling this again does nothing.
    pub fn close(&mut self) -> CodecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.filter.close(&mut self.downstream)?;
        self.closed = true;
        self.downstream.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn state(&self) -> FilterState {
        self.filter.state()
    }

    pub fn filter(&self) -> &Filter<C> {
        &self.filter
    }

    pub fn get_ref(&self) -> &D {
        &self.downstream
    }

    pub fn get_mut(&mut self) -> &mut D {
        &mut self.downstream
    }

    /// Gives back the downstream sink, dropping the codec and any state it still holds.
    pub fn into_inner(self) -> D {
        self.downstream
    }
}

impl<C: Codec, D: ChunkSink> ChunkSink for CodecSink<C, D> {
    fn add(&mut self, chunk: &[u8]) -> CodecResult<()> {
        CodecSink::add(self, chunk)
    }

    fn flush(&mut self) -> CodecResult<()> {
        CodecSink::flush(self)
    }

    fn close(&mut self) -> CodecResult<()> {
        CodecSink::close(self)
    }
}

impl<C: Codec, D: ChunkSink> io::Write for CodecSink<C, D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CodecSink::add(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        CodecSink::flush(self)?;
        Ok(())
    }
}

impl<C, D> std::fmt::Debug for CodecSink<C, D>
where
    C: Codec + std::fmt::Debug,
    D: ChunkSink + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecSink")
            .field("filter", &self.filter)
            .field("downstream", &self.downstream)
            .field("closed", &self.closed)
            .finish()
    }
}
