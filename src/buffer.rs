//! A byte region with a read cursor and a write cursor.
//!
//! Bytes in `[0, read)` have been consumed, bytes in `[read, write)` are pending, and bytes in
//! `[write, capacity)` are free space the next producer can write into.
use log::debug;

use crate::{CodecError, CodecResult};

enum Storage {
    /// Vec-backed storage that may be reallocated up to the buffer's ceiling.
    Heap(Vec<u8>),
    /// Storage allocated once at creation and never reallocated.
    Fixed(Box<[u8]>),
}

impl Storage {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Heap(v) => v,
            Storage::Fixed(b) => b,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Heap(v) => v,
            Storage::Fixed(b) => b,
        }
    }
}

/// A cursor buffer used by a [`Filter`](crate::Filter) for one direction of a stream.
///
/// Pending bytes are never reordered or duplicated by [`append`](Self::append),
/// [`consume`](Self::consume), [`compact`](Self::compact) or [`grow`](Self::grow), and
/// `0 <= read <= write <= capacity` holds after every operation.
pub struct Buffer {
    storage: Storage,
    read: usize,
    write: usize,
    ceiling: usize,
}

impl Buffer {
    /// Creates a growable buffer of `capacity` bytes that may grow up to `ceiling` bytes.
    pub fn heap(capacity: usize, ceiling: usize) -> Self {
        Self {
            storage: Storage::Heap(vec![0; capacity]),
            read: 0,
            write: 0,
            ceiling: ceiling.max(capacity),
        }
    }

    /// Creates a buffer of exactly `capacity` bytes that can never grow.
    pub fn fixed(capacity: usize) -> Self {
        Self {
            storage: Storage::Fixed(vec![0; capacity].into_boxed_slice()),
            read: 0,
            write: 0,
            ceiling: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.as_slice().len()
    }

    /// The largest capacity this buffer may grow to.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn is_growable(&self) -> bool {
        matches!(self.storage, Storage::Heap(_)) && self.capacity() < self.ceiling
    }

    pub fn read_pos(&self) -> usize {
        self.read
    }

    pub fn write_pos(&self) -> usize {
        self.write
    }

    // returns the length of the pending section.
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Free space after the write cursor.
    pub fn free(&self) -> usize {
        self.capacity() - self.write
    }

    /// An immutable view of the pending section.
    pub fn unread(&self) -> &[u8] {
        &self.storage.as_slice()[self.read..self.write]
    }

    /// A mutable view of the free section. Call [`Self::mark_written`] with the number of bytes
    /// written into it.
    pub fn unwritten_mut(&mut self) -> &mut [u8] {
        let write = self.write;
        &mut self.storage.as_mut_slice()[write..]
    }

    /// Copies as much of `bytes` as fits after the write cursor, returning how many bytes were
    /// copied. Already-read bytes are discarded first if the tail is too short for all of
    /// `bytes`.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        if self.free() < bytes.len() {
            self.compact();
        }
        let n = bytes.len().min(self.free());
        let write = self.write;
        self.storage.as_mut_slice()[write..write + n].copy_from_slice(&bytes[..n]);
        self.write += n;
        n
    }

    /// Marks `n` pending bytes as read.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "attempted to read past end of buffer");
        self.read += n;
        if self.read == self.write {
            // Nothing pending, so the whole region is free again.
            self.read = 0;
            self.write = 0;
        }
    }

    pub fn mark_written(&mut self, n: usize) {
        assert!(n <= self.free(), "attempted to write past end of buffer");
        self.write += n;
    }

    /// Moves the pending section to the start of the buffer.
    pub fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        let pending = self.len();
        let (read, write) = (self.read, self.write);
        self.storage.as_mut_slice().copy_within(read..write, 0);
        self.read = 0;
        self.write = pending;
    }

    /// Reallocates to `new_capacity` bytes, keeping pending bytes.
    ///
    /// Shrinking is a no-op. Fails with [`CodecError::Capacity`] when `new_capacity` is past the
    /// ceiling or when the storage is fixed.
    pub fn grow(&mut self, new_capacity: usize) -> CodecResult<()> {
        if new_capacity <= self.capacity() {
            return Ok(());
        }
        let ceiling = self.ceiling;
        match &mut self.storage {
            Storage::Heap(data) if new_capacity <= ceiling => {
                debug!("growing buffer from {} to {new_capacity} bytes", data.len());
                data.resize(new_capacity, 0);
                Ok(())
            }
            _ => Err(CodecError::Capacity {
                requested: new_capacity,
                ceiling,
            }),
        }
    }

    /// Doubles the capacity, clamped to the ceiling. Fails if the buffer is already as large as
    /// it may get.
    pub fn expand(&mut self) -> CodecResult<()> {
        let capacity = self.capacity();
        let target = capacity
            .saturating_mul(2)
            .min(self.ceiling)
            .max(capacity.saturating_add(1));
        self.grow(target)
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("fixed", &matches!(self.storage, Storage::Fixed(_)))
            .field("capacity", &self.capacity())
            .field("ceiling", &self.ceiling)
            .field("read", &self.read)
            .field("write", &self.write)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn check_invariant(buf: &Buffer) {
        assert!(buf.read_pos() <= buf.write_pos());
        assert!(buf.write_pos() <= buf.capacity());
    }

    #[test]
    fn append_copies_what_fits() {
        let mut buf = Buffer::heap(4, 16);
        assert_eq!(buf.append(b"abcdef"), 4);
        assert_eq!(buf.unread(), b"abcd");
        assert_eq!(buf.free(), 0);
        assert_eq!(buf.append(b"ef"), 0);
        check_invariant(&buf);
    }

    #[test]
    fn append_compacts_when_tail_is_short() {
        let mut buf = Buffer::heap(6, 6);
        buf.append(b"abcdef");
        buf.consume(4);
        assert_eq!(buf.read_pos(), 4);
        assert_eq!(buf.append(b"ghij"), 4);
        assert_eq!(buf.read_pos(), 0);
        assert_eq!(buf.unread(), b"efghij");
        check_invariant(&buf);
    }

    #[test]
    fn append_leaves_cursors_when_tail_is_long_enough() {
        let mut buf = Buffer::heap(8, 8);
        buf.append(b"abc");
        buf.consume(1);
        buf.append(b"de");
        assert_eq!(buf.read_pos(), 1);
        assert_eq!(buf.unread(), b"bcde");
    }

    #[test]
    fn consuming_everything_resets_cursors() {
        let mut buf = Buffer::heap(8, 8);
        buf.append(b"abc");
        buf.consume(3);
        assert_eq!((buf.read_pos(), buf.write_pos()), (0, 0));
        assert_eq!(buf.free(), 8);
    }

    #[test]
    #[should_panic(expected = "attempted to read past end of buffer")]
    fn consume_past_end_panics() {
        let mut buf = Buffer::heap(8, 8);
        buf.append(b"abc");
        buf.consume(4);
    }

    #[test]
    #[should_panic(expected = "attempted to write past end of buffer")]
    fn mark_written_past_end_panics() {
        let mut buf = Buffer::heap(2, 2);
        buf.mark_written(3);
    }

    #[test]
    fn unwritten_then_mark_written() {
        let mut buf = Buffer::heap(4, 4);
        buf.unwritten_mut()[..2].copy_from_slice(b"xy");
        buf.mark_written(2);
        assert_eq!(buf.unread(), b"xy");
    }

    #[test]
    fn grow_preserves_pending_bytes() {
        let mut buf = Buffer::heap(4, 64);
        buf.append(b"abcd");
        buf.consume(1);
        buf.grow(32).unwrap();
        assert_eq!(buf.capacity(), 32);
        assert_eq!(buf.unread(), b"bcd");
        assert_eq!(buf.free(), 28);
        check_invariant(&buf);
    }

    #[test]
    fn grow_past_ceiling_fails() {
        let mut buf = Buffer::heap(4, 8);
        assert_matches!(
            buf.grow(9),
            Err(CodecError::Capacity {
                requested: 9,
                ceiling: 8
            })
        );
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn fixed_buffers_never_grow() {
        let mut buf = Buffer::fixed(4);
        assert!(!buf.is_growable());
        assert_matches!(buf.grow(5), Err(CodecError::Capacity { requested: 5, .. }));
        buf.grow(2).unwrap();
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn expand_doubles_up_to_ceiling() {
        let mut buf = Buffer::heap(4, 12);
        buf.expand().unwrap();
        assert_eq!(buf.capacity(), 8);
        buf.expand().unwrap();
        assert_eq!(buf.capacity(), 12);
        assert!(!buf.is_growable());
        assert_matches!(buf.expand(), Err(CodecError::Capacity { .. }));
    }

    #[test]
    fn compact_without_reads_is_noop() {
        let mut buf = Buffer::heap(4, 4);
        buf.append(b"ab");
        buf.compact();
        assert_eq!((buf.read_pos(), buf.write_pos()), (0, 2));
    }
}
