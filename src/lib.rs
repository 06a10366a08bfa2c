//! A chunked streaming driver for block-oriented compression codecs.
//!
//! Concrete codecs expose one primitive: "given this much input and this much output space,
//! consume some bytes and produce some bytes". This crate turns that primitive into a
//! back-pressure-respecting stream. Callers push arbitrarily sized chunks into a [`CodecSink`];
//! a [`Filter`] buffers them, invokes the codec in bounded bursts and drains produced bytes to
//! the next [`ChunkSink`] in the pipeline, in order, exactly once.
//!
//! # Example
//!
//! ```
//! use codec_stream::{BufferLength, CollectingSink, Converter, FilterOptions};
//! use codec_stream::codecs::Identity;
//!
//! # fn main() -> codec_stream::CodecResult<()> {
//! // One-shot conversion.
//! let converter = Converter::new(Identity::new());
//! assert_eq!(converter.convert(b"hello")?, b"hello");
//!
//! // Chunked conversion with small buffers.
//! let options = FilterOptions::new()
//!     .input_buffer_length(BufferLength::Bytes(4))
//!     .output_buffer_length(BufferLength::Bytes(4));
//! let converter = Converter::with_options(Identity::new(), options)?;
//! let mut sink = converter.start_chunked(CollectingSink::new())?;
//! sink.add(b"hello, ")?;
//! sink.add(b"world")?;
//! sink.close()?;
//! assert_eq!(sink.into_inner().into_bytes(), b"hello, world");
//! # Ok(())
//! # }
//! ```
//!
//! With the default `zstd` and `lz4` features, [`codecs`] also provides native encoders and
//! decoders, and [`Format`] selects one by name at runtime.
use std::{io, sync::Arc};

pub mod buffer;
pub mod codec;
pub mod codecs;
pub mod converter;
pub mod filter;
pub mod format;
pub mod holder;
pub mod io_utils;
pub mod options;
pub mod sink;

pub use buffer::Buffer;
pub use codec::{Codec, CodecState, ProcessResult, Status};
pub use converter::Converter;
pub use filter::{Filter, FilterState};
pub use format::{Decoder, Encoder, Format};
pub use holder::{BufferHolder, LengthBounds};
pub use io_utils::WriteSink;
pub use options::{BufferKind, BufferLength, FilterOptions, MAX_BUFFER_LENGTH};
pub use sink::{ChunkSink, CodecSink, CollectingSink};

/// Coarse classification of a [`CodecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Codec state could not be created or a parameter was rejected while creating it.
    Initialization,
    /// A buffer could not grow enough to satisfy the codec.
    Capacity,
    /// The codec reported an algorithm-level failure.
    Processing,
    /// The caller broke the API contract. Nothing was mutated.
    Usage,
    /// Reading from a source or writing to a downstream writer failed.
    Io,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum CodecError {
    #[error("failed to initialize {codec}: {message}")]
    Initialization {
        codec: &'static str,
        message: String,
    },
    #[error("buffer needs {requested} bytes, but is limited to {ceiling}")]
    Capacity { requested: usize, ceiling: usize },
    #[error("{codec} failed: {message}")]
    Processing {
        codec: &'static str,
        message: String,
    },
    #[error("{codec} stream ended in the middle of a frame")]
    Truncated { codec: &'static str },
    #[error("{codec} left {remaining} input bytes unconsumed at end of stream")]
    TrailingInput {
        codec: &'static str,
        remaining: usize,
    },
    #[error("{codec} made no progress with {input} input bytes and {output} bytes of output space")]
    Stalled {
        codec: &'static str,
        input: usize,
        output: usize,
    },
    #[error("stream is already closed")]
    Closed,
    #[error("{which} buffer length {length} is outside 1..={max}")]
    InvalidBufferLength {
        which: &'static str,
        length: usize,
        max: usize,
    },
    #[error("invalid {codec} parameter: {message}")]
    InvalidParameter {
        codec: &'static str,
        message: String,
    },
    #[error("unknown format {0:?}")]
    UnknownFormat(String),
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Initialization { .. } => ErrorKind::Initialization,
            CodecError::Capacity { .. } => ErrorKind::Capacity,
            CodecError::Processing { .. }
            | CodecError::Truncated { .. }
            | CodecError::TrailingInput { .. }
            | CodecError::Stalled { .. } => ErrorKind::Processing,
            CodecError::Closed
            | CodecError::InvalidBufferLength { .. }
            | CodecError::InvalidParameter { .. }
            | CodecError::UnknownFormat(_) => ErrorKind::Usage,
            CodecError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        CodecError::Io(Arc::new(err))
    }
}

impl From<CodecError> for io::Error {
    fn from(err: CodecError) -> Self {
        let kind = match &err {
            CodecError::Io(inner) => inner.kind(),
            err if err.kind() == ErrorKind::Usage => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

// Streams may move between threads; each one still has a single owner.
static_assertions::assert_impl_all!(Buffer: Send);
static_assertions::assert_impl_all!(Filter<codecs::Identity>: Send);
static_assertions::assert_impl_all!(CodecSink<Encoder, CollectingSink>: Send);
static_assertions::assert_impl_all!(CodecSink<Decoder, CollectingSink>: Send);
#[cfg(feature = "zstd")]
static_assertions::assert_impl_all!(Filter<codecs::ZstdEncoder>: Send);
#[cfg(feature = "lz4")]
static_assertions::assert_impl_all!(Filter<codecs::Lz4Encoder>: Send);
