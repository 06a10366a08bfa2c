//! Lazily created, releasable buffers.
use log::debug;

use crate::{Buffer, BufferKind, BufferLength, CodecResult, MAX_BUFFER_LENGTH};

/// Codec-specific limits for one of a filter's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// The smallest buffer the codec can work with.
    pub min: usize,
    /// The largest buffer the codec should ever be given. Heap buffers never grow past it.
    pub max: usize,
    /// The length used for [`BufferLength::Auto`].
    pub default: usize,
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self {
            min: 1,
            max: MAX_BUFFER_LENGTH,
            default: Self::DEFAULT_LENGTH,
        }
    }
}

impl LengthBounds {
    pub const DEFAULT_LENGTH: usize = 64 * 1024;

    pub fn new(min: usize, max: usize, default: usize) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            min,
            max,
            default: default.clamp(min, max),
        }
    }

    /// Returns these bounds with the default replaced.
    pub fn with_default(self, default: usize) -> Self {
        Self::new(self.min, self.max, default)
    }

    /// Returns these bounds with the minimum raised to at least `min`.
    pub fn with_min(self, min: usize) -> Self {
        Self::new(self.min.max(min), self.max, self.default)
    }

    /// Clamps `length` into `[min, max]`.
    pub fn clamp(&self, length: usize) -> usize {
        length.clamp(self.min, self.max)
    }

    /// Resolves a configured length into a concrete one.
    pub fn coerce(&self, length: BufferLength) -> usize {
        match length {
            BufferLength::Auto => self.default,
            BufferLength::Bytes(n) => self.clamp(n),
        }
    }
}

/// Owns the buffer for one direction of a filter.
///
/// The buffer is built on first use and can be released at most once; after
/// [`release`](Self::release) a later request builds a fresh buffer.
#[derive(Debug)]
pub struct BufferHolder {
    buffer: Option<Buffer>,
    length: BufferLength,
    bounds: LengthBounds,
    kind: BufferKind,
}

impl BufferHolder {
    pub fn new(length: BufferLength, bounds: LengthBounds, kind: BufferKind) -> Self {
        Self {
            buffer: None,
            length,
            bounds,
            kind,
        }
    }

    /// The length a buffer is built with when none is requested explicitly.
    pub fn preferred_length(&self) -> usize {
        self.bounds.coerce(self.length)
    }

    /// Returns the buffer, building it at the preferred length if needed.
    pub fn buffer(&mut self) -> CodecResult<&mut Buffer> {
        self.buffer_of_length(self.preferred_length())
    }

    /// Returns a buffer of at least `preferred` bytes (clamped to the bounds).
    ///
    /// An existing buffer is reused as is when large enough, and grown otherwise.
    pub fn buffer_of_length(&mut self, preferred: usize) -> CodecResult<&mut Buffer> {
        let length = self.bounds.clamp(preferred);
        let (kind, ceiling) = (self.kind, self.bounds.max);
        let buffer = self.buffer.get_or_insert_with(|| {
            debug!("allocating {kind:?} buffer of {length} bytes");
            kind.build(length, ceiling)
        });
        if buffer.capacity() < length {
            buffer.grow(length)?;
        }
        Ok(buffer)
    }

    pub fn get(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Drops the buffer's storage. Returns whether there was anything to release.
    pub fn release(&mut self) -> bool {
        self.buffer.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodecError;
    use assert_matches::assert_matches;

    fn holder(length: BufferLength, kind: BufferKind) -> BufferHolder {
        BufferHolder::new(length, LengthBounds::new(8, 64, 32), kind)
    }

    #[test]
    fn bounds_are_normalized() {
        let bounds = LengthBounds::new(0, 4, 100);
        assert_eq!(bounds, LengthBounds { min: 1, max: 4, default: 4 });
        assert_eq!(bounds.with_min(10).max, 10);
    }

    #[test]
    fn coercion() {
        let bounds = LengthBounds::new(8, 64, 32);
        assert_eq!(bounds.coerce(BufferLength::Auto), 32);
        assert_eq!(bounds.coerce(BufferLength::Bytes(1)), 8);
        assert_eq!(bounds.coerce(BufferLength::Bytes(16)), 16);
        assert_eq!(bounds.coerce(BufferLength::Bytes(1000)), 64);
    }

    #[test]
    fn buffer_is_lazy() {
        let mut h = holder(BufferLength::Bytes(16), BufferKind::Heap);
        assert!(!h.is_allocated());
        assert_eq!(h.buffer().unwrap().capacity(), 16);
        assert!(h.is_allocated());
    }

    #[test]
    fn auto_uses_codec_default() {
        let mut h = holder(BufferLength::Auto, BufferKind::Heap);
        assert_eq!(h.buffer().unwrap().capacity(), 32);
    }

    #[test]
    fn existing_buffer_is_reused_or_grown() {
        let mut h = holder(BufferLength::Bytes(16), BufferKind::Heap);
        h.buffer().unwrap().append(b"abc");
        assert_eq!(h.buffer_of_length(8).unwrap().capacity(), 16);
        let grown = h.buffer_of_length(48).unwrap();
        assert_eq!(grown.capacity(), 48);
        assert_eq!(grown.unread(), b"abc");
        // Requests past the maximum are clamped rather than rejected.
        assert_eq!(h.buffer_of_length(1000).unwrap().capacity(), 64);
    }

    #[test]
    fn fixed_buffer_cannot_be_grown() {
        let mut h = holder(BufferLength::Bytes(16), BufferKind::Fixed);
        h.buffer().unwrap();
        assert_matches!(
            h.buffer_of_length(32),
            Err(CodecError::Capacity { requested: 32, .. })
        );
    }

    #[test]
    fn release_is_idempotent() {
        let mut h = holder(BufferLength::Auto, BufferKind::Heap);
        assert!(!h.release());
        h.buffer().unwrap();
        assert!(h.release());
        assert!(!h.release());
        assert!(h.get().is_none());
    }
}
