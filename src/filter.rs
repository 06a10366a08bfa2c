//! Drives a codec over a stream of chunks.
//!
//! A [`Filter`] owns an input buffer, an output buffer and the codec's per-stream state. It does
//! no I/O of its own: callers hand it chunks, and it hands produced bytes to a [`ChunkSink`]
//! whenever its output buffer has to be emptied.
use log::{debug, trace, warn};

use crate::{
    codec::{Codec, CodecState, ProcessResult, Status},
    holder::BufferHolder,
    sink::ChunkSink,
    Buffer, CodecError, CodecResult, FilterOptions,
};

/// Lifecycle of a [`Filter`].
///
/// `Uninitialized → Active → (Flushing → Active)* → Finalizing → Closed`, with `Failed`
/// reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// No codec state or buffers have been allocated yet.
    Uninitialized,
    Active,
    Flushing,
    Finalizing,
    /// Everything was emitted and all resources were released.
    Closed,
    /// A fatal error occurred. Resources were released, and every later call reports the error.
    Failed,
}

#[derive(Clone, Copy)]
enum Stage {
    Process,
    Flush,
    Finish,
}

/// Streams chunks through a codec.
///
/// ```
/// use codec_stream::{CollectingSink, Filter, FilterState};
/// use codec_stream::codecs::Identity;
///
/// # fn main() -> codec_stream::CodecResult<()> {
/// let mut filter = Filter::new(Identity::new())?;
/// let mut out = CollectingSink::new();
/// filter.process(b"abc", &mut out)?;
/// filter.process(b"def", &mut out)?;
/// filter.close(&mut out)?;
/// assert_eq!(filter.state(), FilterState::Closed);
/// assert_eq!(out.bytes(), b"abcdef");
/// # Ok(())
/// # }
/// ```
pub struct Filter<C: Codec> {
    codec: C,
    state: FilterState,
    // Created on the first call that needs it; taking it out destroys it.
    codec_state: Option<C::State>,
    pump: Pump,
    failure: Option<CodecError>,
}

impl<C: Codec> Filter<C> {
    pub fn new(codec: C) -> CodecResult<Self> {
        Self::with_options(codec, FilterOptions::default())
    }

    /// Creates a filter, rejecting out-of-range options and parameters. Nothing is allocated
    /// until the first chunk arrives.
    pub fn with_options(codec: C, options: FilterOptions) -> CodecResult<Self> {
        options.validate()?;
        codec.validate()?;
        let pump = Pump {
            name: codec.name(),
            input: BufferHolder::new(
                options.input_buffer_length,
                codec.input_bounds(),
                options.buffer_kind,
            ),
            output: BufferHolder::new(
                options.output_buffer_length,
                codec.output_bounds(),
                options.buffer_kind,
            ),
            consumed: 0,
            produced: 0,
            delivered: 0,
        };
        Ok(Self {
            codec,
            state: FilterState::Uninitialized,
            codec_state: None,
            pump,
            failure: None,
        })
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The error that moved this filter to [`FilterState::Failed`], if any.
    pub fn error(&self) -> Option<&CodecError> {
        self.failure.as_ref()
    }

    /// Whether codec state is currently allocated.
    pub fn has_codec_state(&self) -> bool {
        self.codec_state.is_some()
    }

    pub fn input_buffer(&self) -> Option<&Buffer> {
        self.pump.input.get()
    }

    pub fn output_buffer(&self) -> Option<&Buffer> {
        self.pump.output.get()
    }

    /// Total input bytes the codec has consumed.
    pub fn total_consumed(&self) -> u64 {
        self.pump.consumed
    }

    /// Total output bytes the codec has reported producing.
    pub fn total_produced(&self) -> u64 {
        self.pump.produced
    }

    /// Total output bytes handed to downstream sinks.
    pub fn total_delivered(&self) -> u64 {
        self.pump.delivered
    }

    /// Feeds `chunk` to the codec, handing produced bytes to `out`.
    ///
    /// Returns once the whole chunk has been taken in; the codec may still hold some of it.
    /// An empty chunk with nothing buffered does nothing.
    pub fn process<D: ChunkSink + ?Sized>(&mut self, chunk: &[u8], out: &mut D) -> CodecResult<()> {
        self.check_open()?;
        if chunk.is_empty() && self.pump.pending_input() == 0 {
            return Ok(());
        }
        let result = self.drive(chunk, out, Stage::Process);
        self.settle(result)
    }

    /// Pushes everything the codec has retained so far to `out` without ending the stream.
    pub fn flush<D: ChunkSink + ?Sized>(&mut self, out: &mut D) -> CodecResult<()> {
        self.check_open()?;
        if self.state == FilterState::Uninitialized {
            return Ok(());
        }
        let result = self.drive(&[], out, Stage::Flush);
        if result.is_ok() {
            self.state = FilterState::Active;
        }
        self.settle(result)
    }

    /// Ends the stream: processes buffered input, writes the codec's trailer, hands the
    /// remaining bytes to `out` and releases every resource.
    ///
    /// Closing an already closed filter does nothing. Note that this does not close `out`.
    pub fn close<D: ChunkSink + ?Sized>(&mut self, out: &mut D) -> CodecResult<()> {
        match self.state {
            FilterState::Closed => return Ok(()),
            FilterState::Failed => return Err(self.recorded_failure()),
            _ => {}
        }
        let result = self.drive(&[], out, Stage::Finish);
        if result.is_ok() {
            debug!(
                "closed {} stream: {} bytes in, {} bytes out",
                self.pump.name, self.pump.consumed, self.pump.produced
            );
            self.release();
            self.state = FilterState::Closed;
        }
        self.settle(result)
    }

    fn drive<D: ChunkSink + ?Sized>(
        &mut self,
        chunk: &[u8],
        out: &mut D,
        stage: Stage,
    ) -> CodecResult<()> {
        let codec_state = match &mut self.codec_state {
            Some(codec_state) => codec_state,
            slot @ None => {
                let codec_state = self.codec.create_state()?;
                debug!("created {} codec state", self.pump.name);
                self.state = FilterState::Active;
                slot.insert(codec_state)
            }
        };
        let pump = &mut self.pump;
        match stage {
            Stage::Process => pump.run(codec_state, chunk, out)?,
            Stage::Flush => {
                self.state = FilterState::Flushing;
                pump.run(codec_state, chunk, out)?;
                pump.complete(codec_state, out, <C::State as CodecState>::flush)?;
            }
            Stage::Finish => {
                self.state = FilterState::Finalizing;
                pump.run(codec_state, chunk, out)?;
                pump.complete(codec_state, out, <C::State as CodecState>::finish)?;
                let remaining = pump.pending_input();
                if remaining > 0 {
                    return Err(CodecError::TrailingInput {
                        codec: pump.name,
                        remaining,
                    });
                }
            }
        }
        pump.drain_output(out)
    }

    fn check_open(&self) -> CodecResult<()> {
        match self.state {
            FilterState::Closed => Err(CodecError::Closed),
            FilterState::Failed => Err(self.recorded_failure()),
            _ => Ok(()),
        }
    }

    fn recorded_failure(&self) -> CodecError {
        self.failure.clone().unwrap_or(CodecError::Closed)
    }

    // Any error that escapes the processing loop is fatal.
    fn settle(&mut self, result: CodecResult<()>) -> CodecResult<()> {
        if let Err(err) = &result {
            warn!("{} stream failed: {err}", self.pump.name);
            self.release();
            self.failure = Some(err.clone());
            self.state = FilterState::Failed;
        }
        result
    }

    fn release(&mut self) {
        if self.codec_state.take().is_some() {
            debug!("released {} codec state", self.pump.name);
        }
        self.pump.input.release();
        self.pump.output.release();
    }
}

impl<C: Codec + std::fmt::Debug> std::fmt::Debug for Filter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("codec", &self.codec)
            .field("state", &self.state)
            .field("input", &self.pump.input)
            .field("output", &self.pump.output)
            .field("failure", &self.failure)
            .finish()
    }
}

/// The buffers and counters of a filter, kept apart from the codec state so both can be
/// borrowed at once.
struct Pump {
    name: &'static str,
    input: BufferHolder,
    output: BufferHolder,
    consumed: u64,
    produced: u64,
    delivered: u64,
}

impl Pump {
    fn pending_input(&self) -> usize {
        self.input.get().map_or(0, Buffer::len)
    }

    /// Feeds `chunk` through `codec` until all of it has been taken into the input buffer and
    /// the codec can make no further use of what is buffered.
    fn run<S: CodecState + ?Sized, D: ChunkSink + ?Sized>(
        &mut self,
        codec: &mut S,
        mut chunk: &[u8],
        out: &mut D,
    ) -> CodecResult<()> {
        loop {
            let src = self.input.buffer()?;
            if !chunk.is_empty() {
                let n = src.append(chunk);
                chunk = &chunk[n..];
            }
            if src.is_empty() {
                return Ok(());
            }
            let dst = reserve(&mut self.output, codec.min_output_len(), out, &mut self.delivered)?;
            let (pending, free) = (src.len(), dst.free());
            let result = codec.process(src.unread(), dst.unwritten_mut())?;
            trace!(
                "{}: process {pending}/{free} -> {} consumed, {} produced, {:?}",
                self.name,
                result.consumed,
                result.produced,
                result.status
            );
            src.consume(result.consumed);
            dst.mark_written(result.produced);
            self.consumed += result.consumed as u64;
            self.produced += result.produced as u64;

            if result.made_progress() {
                if dst.free() == 0 {
                    drain(dst, out, &mut self.delivered)?;
                }
                continue;
            }
            match result.status {
                Status::NeedInput => {
                    if chunk.is_empty() {
                        // Suspend until the caller has more input.
                        return Ok(());
                    }
                    // The codec cannot use what it has; make room for more of the chunk.
                    src.compact();
                    if src.free() == 0 {
                        src.expand()?;
                    }
                }
                Status::NeedOutput => {
                    if dst.is_empty() {
                        dst.expand()?;
                    } else {
                        drain(dst, out, &mut self.delivered)?;
                    }
                }
                Status::Finished => {
                    return Err(CodecError::TrailingInput {
                        codec: self.name,
                        remaining: pending + chunk.len(),
                    });
                }
            }
        }
    }

    /// Calls `op` (flush or finish) until the codec reports it is done.
    fn complete<S, D, F>(&mut self, codec: &mut S, out: &mut D, mut op: F) -> CodecResult<()>
    where
        S: CodecState + ?Sized,
        D: ChunkSink + ?Sized,
        F: FnMut(&mut S, &mut [u8]) -> CodecResult<ProcessResult>,
    {
        loop {
            let dst = reserve(&mut self.output, codec.min_output_len(), out, &mut self.delivered)?;
            let free = dst.free();
            let result = op(codec, dst.unwritten_mut())?;
            trace!(
                "{}: complete {free} -> {} produced, {:?}",
                self.name,
                result.produced,
                result.status
            );
            dst.mark_written(result.produced);
            self.produced += result.produced as u64;
            match result.status {
                Status::Finished => return Ok(()),
                Status::NeedInput if result.produced == 0 => {
                    return Err(CodecError::Stalled {
                        codec: self.name,
                        input: self.input.get().map_or(0, Buffer::len),
                        output: free,
                    });
                }
                _ => {}
            }
            if result.produced == 0 && dst.is_empty() {
                dst.expand()?;
            } else if result.produced == 0 || dst.free() == 0 {
                drain(dst, out, &mut self.delivered)?;
            }
        }
    }

    fn drain_output<D: ChunkSink + ?Sized>(&mut self, out: &mut D) -> CodecResult<()> {
        if !self.output.is_allocated() {
            return Ok(());
        }
        let dst = self.output.buffer()?;
        drain(dst, out, &mut self.delivered)
    }
}

/// Returns the output buffer with at least `need` bytes free, draining and then growing it as
/// needed.
fn reserve<'a, D: ChunkSink + ?Sized>(
    holder: &'a mut BufferHolder,
    need: usize,
    out: &mut D,
    delivered: &mut u64,
) -> CodecResult<&'a mut Buffer> {
    let dst = holder.buffer()?;
    if dst.free() >= need {
        return Ok(dst);
    }
    drain(dst, out, delivered)?;
    dst.compact();
    if dst.free() < need {
        dst.grow(need)?;
    }
    Ok(dst)
}

fn drain<D: ChunkSink + ?Sized>(
    buffer: &mut Buffer,
    out: &mut D,
    delivered: &mut u64,
) -> CodecResult<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let n = buffer.len();
    trace!("draining {n} bytes");
    out.add(buffer.unread())?;
    buffer.consume(n);
    *delivered += n as u64;
    Ok(())
}
