//! zstd stream codecs backed by the reference C library.
use ::zstd::zstd_safe::{
    self, get_error_name, CCtx, CParameter, DCtx, DParameter, InBuffer, OutBuffer, SafeResult,
};
use log::debug;

use crate::{
    codec::{Codec, CodecState, ProcessResult, Status},
    CodecError, CodecResult, LengthBounds,
};

const NAME: &str = "zstd";

fn handle_error(res: SafeResult) -> CodecResult<usize> {
    res.map_err(|code| CodecError::Processing {
        codec: NAME,
        message: get_error_name(code).into(),
    })
}

fn init_error(res: SafeResult) -> CodecResult<usize> {
    res.map_err(|code| CodecError::Initialization {
        codec: NAME,
        message: get_error_name(code).into(),
    })
}

/// Compresses into zstd frames.
///
/// ```
/// use codec_stream::{codecs::{ZstdDecoder, ZstdEncoder}, Converter};
///
/// # fn main() -> codec_stream::CodecResult<()> {
/// let compressed = Converter::new(ZstdEncoder::new().level(19)).convert(b"hello hello hello")?;
/// let restored = Converter::new(ZstdDecoder::new()).convert(&compressed)?;
/// assert_eq!(restored, b"hello hello hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ZstdEncoder {
    level: i32,
    parameters: Vec<CParameter>,
}

impl Default for ZstdEncoder {
    fn default() -> Self {
        Self {
            level: Self::DEFAULT_LEVEL,
            parameters: Vec::new(),
        }
    }
}

impl ZstdEncoder {
    pub const DEFAULT_LEVEL: i32 = 3;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level. Negative levels trade ratio for speed.
    pub fn level(self, level: i32) -> Self {
        Self { level, ..self }
    }

    /// Appends a content checksum to every frame.
    pub fn checksum(self, enabled: bool) -> Self {
        self.parameter(CParameter::ChecksumFlag(enabled))
    }

    pub fn window_log(self, window_log: u32) -> Self {
        self.parameter(CParameter::WindowLog(window_log))
    }

    /// Applies an arbitrary advanced parameter when the stream starts. Parameters are applied
    /// in order, after the level.
    pub fn parameter(mut self, parameter: CParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn get_level(&self) -> i32 {
        self.level
    }
}

impl Codec for ZstdEncoder {
    type State = ZstdEncoderState;

    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self) -> CodecResult<()> {
        let (min, max) = (zstd_safe::min_c_level(), zstd_safe::max_c_level());
        if !(min..=max).contains(&self.level) {
            return Err(CodecError::InvalidParameter {
                codec: NAME,
                message: format!("level {} is outside {min}..={max}", self.level),
            });
        }
        Ok(())
    }

    fn create_state(&self) -> CodecResult<ZstdEncoderState> {
        let mut cctx = CCtx::try_create().ok_or_else(|| CodecError::Initialization {
            codec: NAME,
            message: "could not allocate compression context".into(),
        })?;
        init_error(cctx.set_parameter(CParameter::CompressionLevel(self.level)))?;
        for parameter in &self.parameters {
            init_error(cctx.set_parameter(*parameter))?;
        }
        debug!(
            "zstd compression context at level {} with {} extra parameters",
            self.level,
            self.parameters.len()
        );
        Ok(ZstdEncoderState { cctx })
    }

    fn input_bounds(&self) -> LengthBounds {
        LengthBounds::default().with_default(CCtx::in_size())
    }

    fn output_bounds(&self) -> LengthBounds {
        LengthBounds::default().with_default(CCtx::out_size())
    }
}

pub struct ZstdEncoderState {
    cctx: CCtx<'static>,
}

impl ZstdEncoderState {
    // Runs one of the end-of-input primitives, which report how many bytes are still pending.
    fn drain_with(
        &mut self,
        dst: &mut [u8],
        op: impl FnOnce(&mut CCtx<'static>, &mut OutBuffer<'_, [u8]>) -> SafeResult,
    ) -> CodecResult<ProcessResult> {
        let mut out_buffer = OutBuffer::around(dst);
        let remaining = handle_error(op(&mut self.cctx, &mut out_buffer))?;
        let status = if remaining == 0 {
            Status::Finished
        } else {
            Status::NeedOutput
        };
        Ok(ProcessResult::new(0, out_buffer.pos(), status))
    }
}

impl CodecState for ZstdEncoderState {
    fn process(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<ProcessResult> {
        let mut in_buffer = InBuffer::around(src);
        let mut out_buffer = OutBuffer::around(dst);
        handle_error(self.cctx.compress_stream(&mut out_buffer, &mut in_buffer))?;
        let status = if in_buffer.pos == src.len() {
            Status::NeedInput
        } else {
            Status::NeedOutput
        };
        Ok(ProcessResult::new(in_buffer.pos, out_buffer.pos(), status))
    }

    fn flush(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
        self.drain_with(dst, |cctx, out| cctx.flush_stream(out))
    }

    fn finish(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
        self.drain_with(dst, |cctx, out| cctx.end_stream(out))
    }
}

/// Decompresses one or more concatenated zstd frames.
#[derive(Debug, Clone, Default)]
pub struct ZstdDecoder {
    parameters: Vec<DParameter>,
}

impl ZstdDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses frames whose window is larger than `2^window_log_max` bytes.
    pub fn window_log_max(self, window_log_max: u32) -> Self {
        self.parameter(DParameter::WindowLogMax(window_log_max))
    }

    pub fn parameter(mut self, parameter: DParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

impl Codec for ZstdDecoder {
    type State = ZstdDecoderState;

    fn name(&self) -> &'static str {
        NAME
    }

    fn create_state(&self) -> CodecResult<ZstdDecoderState> {
        let mut dctx = DCtx::try_create().ok_or_else(|| CodecError::Initialization {
            codec: NAME,
            message: "could not allocate decompression context".into(),
        })?;
        for parameter in &self.parameters {
            init_error(dctx.set_parameter(*parameter))?;
        }
        Ok(ZstdDecoderState {
            dctx,
            in_frame: false,
        })
    }

    fn input_bounds(&self) -> LengthBounds {
        LengthBounds::default().with_default(DCtx::in_size())
    }

    fn output_bounds(&self) -> LengthBounds {
        LengthBounds::default().with_default(DCtx::out_size())
    }
}

pub struct ZstdDecoderState {
    dctx: DCtx<'static>,
    // Whether the last call ended somewhere inside a frame.
    in_frame: bool,
}

impl ZstdDecoderState {
    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<(usize, usize)> {
        let mut in_buffer = InBuffer::around(src);
        let mut out_buffer = OutBuffer::around(dst);
        let hint = handle_error(self.dctx.decompress_stream(&mut out_buffer, &mut in_buffer))?;
        self.in_frame = hint != 0;
        Ok((in_buffer.pos, out_buffer.pos()))
    }
}

impl CodecState for ZstdDecoderState {
    fn process(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<ProcessResult> {
        let (consumed, produced) = self.decompress(src, dst)?;
        let status = if !self.in_frame {
            Status::Finished
        } else if consumed == src.len() {
            Status::NeedInput
        } else {
            Status::NeedOutput
        };
        Ok(ProcessResult::new(consumed, produced, status))
    }

    fn flush(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
        if !self.in_frame {
            return Ok(ProcessResult::finished(0));
        }
        let (_, produced) = self.decompress(&[], dst)?;
        if produced == 0 || !self.in_frame {
            Ok(ProcessResult::finished(produced))
        } else {
            Ok(ProcessResult::new(0, produced, Status::NeedOutput))
        }
    }

    fn finish(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
        if !self.in_frame {
            return Ok(ProcessResult::finished(0));
        }
        let (_, produced) = self.decompress(&[], dst)?;
        if !self.in_frame {
            Ok(ProcessResult::finished(produced))
        } else if produced > 0 {
            Ok(ProcessResult::new(0, produced, Status::NeedOutput))
        } else {
            Err(CodecError::Truncated { codec: NAME })
        }
    }
}
