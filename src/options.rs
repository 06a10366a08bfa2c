//! Per-stream configuration.
use crate::{Buffer, CodecError, CodecResult};

/// Hard upper limit on any configured buffer length.
pub const MAX_BUFFER_LENGTH: usize = 256 * 1024 * 1024;

/// Length requested for one of a filter's buffers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BufferLength {
    /// Use the length the codec recommends.
    #[default]
    Auto,
    /// Use this many bytes, coerced into the codec's minimum and maximum.
    Bytes(usize),
}

impl BufferLength {
    fn validate(self, which: &'static str) -> CodecResult<()> {
        match self {
            BufferLength::Bytes(length) if length == 0 || length > MAX_BUFFER_LENGTH => {
                Err(CodecError::InvalidBufferLength {
                    which,
                    length,
                    max: MAX_BUFFER_LENGTH,
                })
            }
            _ => Ok(()),
        }
    }
}

/// How a filter's buffers are backed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Buffers start at the coerced length and may grow up to the codec's ceiling when the codec
    /// needs more room than they have.
    #[default]
    Heap,
    /// Buffers are allocated once at the coerced length and never reallocated. A codec that
    /// needs more than that fails with [`CodecError::Capacity`].
    Fixed,
}

impl BufferKind {
    /// Builds a buffer of this kind.
    pub fn build(self, length: usize, ceiling: usize) -> Buffer {
        match self {
            BufferKind::Heap => Buffer::heap(length, ceiling),
            BufferKind::Fixed => Buffer::fixed(length),
        }
    }
}

/// Options for creating a [`Filter`](crate::Filter).
///
/// ```
/// use codec_stream::{BufferKind, BufferLength, FilterOptions};
///
/// let options = FilterOptions::new()
///     .input_buffer_length(BufferLength::Bytes(64 * 1024))
///     .buffer_kind(BufferKind::Fixed);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub(crate) input_buffer_length: BufferLength,
    pub(crate) output_buffer_length: BufferLength,
    pub(crate) buffer_kind: BufferKind,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specifies the preferred length of the buffer that holds input waiting for the codec.
    pub fn input_buffer_length(self, input_buffer_length: BufferLength) -> Self {
        Self {
            input_buffer_length,
            ..self
        }
    }

    /// Specifies the preferred length of the buffer the codec writes into.
    ///
    /// Produced bytes are drained downstream whenever this buffer fills up, so this also bounds
    /// the size of the chunks handed to the next sink.
    pub fn output_buffer_length(self, output_buffer_length: BufferLength) -> Self {
        Self {
            output_buffer_length,
            ..self
        }
    }

    pub fn buffer_kind(self, buffer_kind: BufferKind) -> Self {
        Self {
            buffer_kind,
            ..self
        }
    }

    pub fn get_input_buffer_length(&self) -> BufferLength {
        self.input_buffer_length
    }

    pub fn get_output_buffer_length(&self) -> BufferLength {
        self.output_buffer_length
    }

    pub fn get_buffer_kind(&self) -> BufferKind {
        self.buffer_kind
    }

    /// Checks that every configured value is in range.
    pub fn validate(&self) -> CodecResult<()> {
        self.input_buffer_length.validate("input")?;
        self.output_buffer_length.validate("output")
    }
}
