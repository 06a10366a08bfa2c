//! The capability interface a concrete codec exposes to the streaming engine.
use crate::{CodecResult, LengthBounds};

/// What a codec needs in order to make further progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// All usable input was consumed. Call again once more input is available.
    NeedInput,
    /// The codec has more to emit, or more input it can still use, but ran out of output space.
    NeedOutput,
    /// The codec reached the end of a frame (when processing) or the end of the stream (when
    /// flushing or finishing).
    Finished,
}

/// The outcome of one invocation of a codec primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// Input bytes consumed; never more than the input offered.
    pub consumed: usize,
    /// Output bytes written; never more than the output space offered.
    pub produced: usize,
    pub status: Status,
}

impl ProcessResult {
    pub fn new(consumed: usize, produced: usize, status: Status) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    pub fn finished(produced: usize) -> Self {
        Self::new(0, produced, Status::Finished)
    }

    pub fn made_progress(&self) -> bool {
        self.consumed > 0 || self.produced > 0
    }
}

/// Live, per-stream codec state.
///
/// Dropping the state releases everything the codec allocated for it.
pub trait CodecState {
    /// Consumes bytes from `src` and writes bytes into `dst`.
    fn process(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<ProcessResult>;

    /// Pushes internally retained output into `dst` without ending the stream. Reports
    /// [`Status::Finished`] once nothing is left to push.
    fn flush(&mut self, _dst: &mut [u8]) -> CodecResult<ProcessResult> {
        Ok(ProcessResult::finished(0))
    }

    /// Writes the end of the stream into `dst`. Reports [`Status::Finished`] once everything,
    /// trailer included, has been written.
    fn finish(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult>;

    /// The least amount of free output space this state needs for any call.
    fn min_output_len(&self) -> usize {
        1
    }
}

/// A codec configuration that can create per-stream states.
///
/// Codec values are cheap configuration; one can start any number of independent streams.
pub trait Codec {
    type State: CodecState;

    fn name(&self) -> &'static str;

    /// Checks parameters that can be rejected without allocating anything.
    fn validate(&self) -> CodecResult<()> {
        Ok(())
    }

    /// Allocates codec state and applies every parameter to it.
    fn create_state(&self) -> CodecResult<Self::State>;

    fn input_bounds(&self) -> LengthBounds {
        LengthBounds::default()
    }

    fn output_bounds(&self) -> LengthBounds {
        LengthBounds::default()
    }
}
