//! LZ4 frame codecs backed by liblz4.
use std::ptr;

use ::lz4::liblz4::{
    check_error, BlockChecksum, BlockMode, BlockSize, ContentChecksum, FrameType,
    LZ4FCompressionContext, LZ4FDecompressionContext, LZ4FFrameInfo, LZ4FPreferences,
    LZ4F_compressBegin, LZ4F_compressBound, LZ4F_compressEnd, LZ4F_compressUpdate,
    LZ4F_createCompressionContext, LZ4F_createDecompressionContext, LZ4F_decompress, LZ4F_flush,
    LZ4F_freeCompressionContext, LZ4F_freeDecompressionContext, LZ4F_VERSION,
};
use log::debug;

use crate::{
    codec::{Codec, CodecState, ProcessResult, Status},
    CodecError, CodecResult, LengthBounds,
};

const NAME: &str = "lz4";

/// Upper bound on the size of an LZ4 frame header.
const HEADER_SIZE_MAX: usize = 19;

/// Highest level liblz4 accepts; levels from 3 upwards select the high-compression mode.
pub const MAX_LEVEL: u32 = 12;

fn check(code: usize) -> CodecResult<usize> {
    check_error(code).map_err(|err| CodecError::Processing {
        codec: NAME,
        message: err.to_string(),
    })
}

/// Maximum size of an uncompressed block within a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Lz4BlockSize {
    #[default]
    Max64KB,
    Max256KB,
    Max1MB,
    Max4MB,
}

impl Lz4BlockSize {
    pub fn bytes(self) -> usize {
        match self {
            Lz4BlockSize::Max64KB => 64 * 1024,
            Lz4BlockSize::Max256KB => 256 * 1024,
            Lz4BlockSize::Max1MB => 1024 * 1024,
            Lz4BlockSize::Max4MB => 4 * 1024 * 1024,
        }
    }

    fn id(self) -> BlockSize {
        match self {
            Lz4BlockSize::Max64KB => BlockSize::Max64KB,
            Lz4BlockSize::Max256KB => BlockSize::Max256KB,
            Lz4BlockSize::Max1MB => BlockSize::Max1MB,
            Lz4BlockSize::Max4MB => BlockSize::Max4MB,
        }
    }
}

/// Compresses into a single LZ4 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lz4Encoder {
    level: u32,
    block_size: Lz4BlockSize,
    block_linked: bool,
    content_checksum: bool,
    block_checksum: bool,
    favor_dec_speed: bool,
}

impl Default for Lz4Encoder {
    fn default() -> Self {
        Self {
            level: 0,
            block_size: Lz4BlockSize::default(),
            block_linked: true,
            content_checksum: false,
            block_checksum: false,
            favor_dec_speed: false,
        }
    }
}

impl Lz4Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level, `0..=MAX_LEVEL`. 0 selects the fast default.
    pub fn level(self, level: u32) -> Self {
        Self { level, ..self }
    }

    pub fn block_size(self, block_size: Lz4BlockSize) -> Self {
        Self { block_size, ..self }
    }

    /// Whether blocks may reference data in earlier blocks. Defaults to true.
    pub fn block_linked(self, block_linked: bool) -> Self {
        Self {
            block_linked,
            ..self
        }
    }

    pub fn content_checksum(self, content_checksum: bool) -> Self {
        Self {
            content_checksum,
            ..self
        }
    }

    pub fn block_checksum(self, block_checksum: bool) -> Self {
        Self {
            block_checksum,
            ..self
        }
    }

    /// Tunes the high-compression levels to produce output that decodes faster.
    pub fn favor_dec_speed(self, favor_dec_speed: bool) -> Self {
        Self {
            favor_dec_speed,
            ..self
        }
    }

    fn preferences(&self) -> LZ4FPreferences {
        LZ4FPreferences {
            frame_info: LZ4FFrameInfo {
                block_size_id: self.block_size.id(),
                block_mode: if self.block_linked {
                    BlockMode::Linked
                } else {
                    BlockMode::Independent
                },
                content_checksum_flag: if self.content_checksum {
                    ContentChecksum::ChecksumEnabled
                } else {
                    ContentChecksum::NoChecksum
                },
                frame_type: FrameType::Frame,
                content_size: 0,
                dict_id: 0,
                block_checksum_flag: if self.block_checksum {
                    BlockChecksum::BlockChecksumEnabled
                } else {
                    BlockChecksum::NoBlockChecksum
                },
            },
            compression_level: self.level,
            auto_flush: 0,
            favor_dec_speed: u32::from(self.favor_dec_speed),
            reserved: [0; 3],
        }
    }

    // Room for a frame header plus the worst case for one full block.
    fn min_output_len(&self) -> usize {
        let preferences = self.preferences();
        HEADER_SIZE_MAX + unsafe { LZ4F_compressBound(self.block_size.bytes(), &preferences) }
    }
}

impl Codec for Lz4Encoder {
    type State = Lz4EncoderState;

    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self) -> CodecResult<()> {
        if self.level > MAX_LEVEL {
            return Err(CodecError::InvalidParameter {
                codec: NAME,
                message: format!("level {} is outside 0..={MAX_LEVEL}", self.level),
            });
        }
        Ok(())
    }

    fn create_state(&self) -> CodecResult<Lz4EncoderState> {
        let mut context = LZ4FCompressionContext(ptr::null_mut());
        check_error(unsafe { LZ4F_createCompressionContext(&mut context, LZ4F_VERSION) })
            .map_err(|err| CodecError::Initialization {
                codec: NAME,
                message: err.to_string(),
            })?;
        debug!(
            "lz4 compression context at level {} with {:?} blocks",
            self.level, self.block_size
        );
        Ok(Lz4EncoderState {
            c: context,
            preferences: self.preferences(),
            block_len: self.block_size.bytes(),
            staged: Vec::with_capacity(self.block_size.bytes()),
            min_output_len: self.min_output_len(),
            started: false,
        })
    }

    fn input_bounds(&self) -> LengthBounds {
        LengthBounds::default().with_default(self.block_size.bytes())
    }

    fn output_bounds(&self) -> LengthBounds {
        LengthBounds::default().with_min(self.min_output_len())
    }
}

pub struct Lz4EncoderState {
    c: LZ4FCompressionContext,
    preferences: LZ4FPreferences,
    block_len: usize,
    // Input waiting for a full block. liblz4 only ever sees whole blocks until a flush or the end
    // of the frame, so the output does not depend on how the input was chunked.
    staged: Vec<u8>,
    min_output_len: usize,
    started: bool,
}

// SAFETY: the context is owned exclusively by this state, which is only reachable through
// `&mut self`. liblz4 contexts are not tied to the thread that created them.
unsafe impl Send for Lz4EncoderState {}

impl Drop for Lz4EncoderState {
    fn drop(&mut self) {
        unsafe { LZ4F_freeCompressionContext(self.c) };
    }
}

impl Lz4EncoderState {
    fn bound(&self, len: usize) -> usize {
        unsafe { LZ4F_compressBound(len, &self.preferences) }
    }

    /// Writes the frame header on first use, returning its size.
    fn begin(&mut self, dst: &mut [u8]) -> CodecResult<usize> {
        if self.started {
            return Ok(0);
        }
        let written = check(unsafe {
            LZ4F_compressBegin(self.c, dst.as_mut_ptr(), dst.len(), &self.preferences)
        })?;
        self.started = true;
        Ok(written)
    }

    /// Hands the staged input to liblz4. A full block is compressed straight into `dst`; a
    /// partial one is copied into the context until the next flush.
    fn update(&mut self, dst: &mut [u8]) -> CodecResult<usize> {
        if self.staged.is_empty() {
            return Ok(0);
        }
        let written = check(unsafe {
            LZ4F_compressUpdate(
                self.c,
                dst.as_mut_ptr(),
                dst.len(),
                self.staged.as_ptr(),
                self.staged.len(),
                ptr::null(),
            )
        })?;
        self.staged.clear();
        Ok(written)
    }

    /// Emits everything buffered so far, ending the frame when `end` is set.
    fn complete(&mut self, dst: &mut [u8], end: bool) -> CodecResult<ProcessResult> {
        if dst.len() < HEADER_SIZE_MAX + self.bound(self.staged.len()) {
            return Ok(ProcessResult::new(0, 0, Status::NeedOutput));
        }
        let header = self.begin(dst)?;
        let staged = self.update(&mut dst[header..])?;
        let rest = &mut dst[header + staged..];
        let written = check(unsafe {
            if end {
                LZ4F_compressEnd(self.c, rest.as_mut_ptr(), rest.len(), ptr::null())
            } else {
                LZ4F_flush(self.c, rest.as_mut_ptr(), rest.len(), ptr::null())
            }
        })?;
        Ok(ProcessResult::finished(header + staged + written))
    }
}

impl CodecState for Lz4EncoderState {
    fn process(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<ProcessResult> {
        let take = src.len().min(self.block_len - self.staged.len());
        self.staged.extend_from_slice(&src[..take]);
        if self.staged.len() < self.block_len {
            return Ok(ProcessResult::new(take, 0, Status::NeedInput));
        }
        if dst.len() < HEADER_SIZE_MAX + self.bound(self.block_len) {
            return Ok(ProcessResult::new(take, 0, Status::NeedOutput));
        }
        let header = self.begin(dst)?;
        let written = self.update(&mut dst[header..])?;
        let status = if take == src.len() {
            Status::NeedInput
        } else {
            Status::NeedOutput
        };
        Ok(ProcessResult::new(take, header + written, status))
    }

    fn flush(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
        self.complete(dst, false)
    }

    fn finish(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
        self.complete(dst, true)
    }

    fn min_output_len(&self) -> usize {
        self.min_output_len
    }
}

/// Decompresses one or more concatenated LZ4 frames.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Lz4Decoder;

impl Lz4Decoder {
    pub fn new() -> Self {
        Lz4Decoder
    }
}

impl Codec for Lz4Decoder {
    type State = Lz4DecoderState;

    fn name(&self) -> &'static str {
        NAME
    }

    fn create_state(&self) -> CodecResult<Lz4DecoderState> {
        let mut context = LZ4FDecompressionContext(ptr::null_mut());
        check_error(unsafe { LZ4F_createDecompressionContext(&mut context, LZ4F_VERSION) })
            .map_err(|err| CodecError::Initialization {
                codec: NAME,
                message: err.to_string(),
            })?;
        Ok(Lz4DecoderState {
            c: context,
            in_frame: false,
        })
    }
}

#[derive(Debug)]
pub struct Lz4DecoderState {
    c: LZ4FDecompressionContext,
    // Whether the last call ended somewhere inside a frame.
    in_frame: bool,
}

// SAFETY: see `Lz4EncoderState`.
unsafe impl Send for Lz4DecoderState {}

impl Drop for Lz4DecoderState {
    fn drop(&mut self) {
        unsafe { LZ4F_freeDecompressionContext(self.c) };
    }
}

impl Lz4DecoderState {
    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<(usize, usize)> {
        let mut dst_size = dst.len();
        let mut src_size = src.len();
        let hint = check(unsafe {
            LZ4F_decompress(
                self.c,
                dst.as_mut_ptr(),
                &mut dst_size,
                src.as_ptr(),
                &mut src_size,
                ptr::null(),
            )
        })?;
        self.in_frame = hint != 0;
        Ok((src_size, dst_size))
    }
}

impl CodecState for Lz4DecoderState {
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
