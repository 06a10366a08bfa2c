use crate::{
    codec::{Codec, CodecState, ProcessResult, Status},
    CodecResult,
};

/// Copies input to output unchanged.
///
/// Useful for exercising pipelines, and as the "none" entry of [`Format`](crate::Format).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Identity;

impl Identity {
    pub fn new() -> Self {
        Identity
    }
}

#[derive(Debug, Default)]
pub struct IdentityState;

impl CodecState for IdentityState {
    fn process(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<ProcessResult> {
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        let status = if n == src.len() {
            Status::NeedInput
        } else {
            Status::NeedOutput
        };
        Ok(ProcessResult::new(n, n, status))
    }

    fn finish(&mut self, _dst: &mut [u8]) -> CodecResult<ProcessResult> {
        Ok(ProcessResult::finished(0))
    }
}

impl Codec for Identity {
    type State = IdentityState;

    fn name(&self) -> &'static str {
        "none"
    }

    fn create_state(&self) -> CodecResult<IdentityState> {
        Ok(IdentityState)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_what_fits() {
        let mut state = Identity::new().create_state().unwrap();
        let mut dst = [0u8; 4];
        let result = state.process(b"abcdef", &mut dst).unwrap();
        assert_eq!(result, ProcessResult::new(4, 4, Status::NeedOutput));
        assert_eq!(&dst, b"abcd");

        let result = state.process(b"ef", &mut dst).unwrap();
        assert_eq!(result, ProcessResult::new(2, 2, Status::NeedInput));
        assert_eq!(state.finish(&mut dst).unwrap(), ProcessResult::finished(0));
    }
}
