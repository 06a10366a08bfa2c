//! One-shot and whole-stream conversion on top of the chunked path.
use std::io::{self, Read, Write};

use log::debug;

use crate::{
    codec::Codec,
    filter::Filter,
    io_utils::WriteSink,
    sink::{ChunkSink, CodecSink, CollectingSink},
    CodecResult, FilterOptions,
};

/// A reusable codec configuration that converts whole inputs or starts chunked streams.
///
/// Every call starts an independent stream with its own codec state and buffers.
#[derive(Debug, Clone)]
pub struct Converter<C> {
    codec: C,
    options: FilterOptions,
}

impl<C: Codec + Clone> Converter<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            options: FilterOptions::default(),
        }
    }

    /// Creates a converter, rejecting invalid options and codec parameters up front.
    pub fn with_options(codec: C, options: FilterOptions) -> CodecResult<Self> {
        options.validate()?;
        codec.validate()?;
        Ok(Self { codec, options })
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// A fresh filter for one stream.
    pub fn filter(&self) -> CodecResult<Filter<C>> {
        Filter::with_options(self.codec.clone(), self.options.clone())
    }

    /// Starts a chunked stream that writes into `downstream`.
    pub fn start_chunked<D: ChunkSink>(&self, downstream: D) -> CodecResult<CodecSink<C, D>> {
        Ok(CodecSink::from_filter(self.filter()?, downstream))
    }

    /// Converts all of `input` at once.
    ///
    /// The result is identical to feeding `input` through [`start_chunked`](Self::start_chunked)
    /// in any split and collecting what comes out.
    pub fn convert(&self, input: &[u8]) -> CodecResult<Vec<u8>> {
        let mut sink = self.start_chunked(CollectingSink::new())?;
        sink.add(input)?;
        sink.close()?;
        Ok(sink.into_inner().into_bytes())
    }

    /// Converts everything `reader` yields into `writer`, returning the number of bytes written.
    pub fn convert_stream<R: Read, W: Write>(&self, mut reader: R, writer: W) -> CodecResult<u64> {
        let mut sink = self.start_chunked(WriteSink::new(writer))?;
        let mut chunk = vec![0; self.codec.input_bounds().coerce(self.options.input_buffer_length)];
        let mut read = 0u64;
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            read += n as u64;
            sink.add(&chunk[..n])?;
        }
        sink.close()?;
        let written = sink.get_ref().position();
        debug!(
            "converted {read} bytes into {written} with {}",
            self.codec.name()
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codecs::Identity, BufferLength, ErrorKind};
    use std::io::Cursor;

    #[test]
    fn convert_matches_chunked() {
        let converter = Converter::new(Identity::new());
        let mut sink = converter.start_chunked(CollectingSink::new()).unwrap();
        for part in [&b"ab"[..], b"", b"cde"] {
            sink.add(part).unwrap();
        }
        sink.close().unwrap();
        assert_eq!(
            sink.into_inner().into_bytes(),
            converter.convert(b"abcde").unwrap()
        );
    }

    #[test]
    fn empty_input_converts_to_empty_output() {
        assert!(Converter::new(Identity::new())
            .convert(&[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn streams_from_reader_to_writer() {
        let options = FilterOptions::new().input_buffer_length(BufferLength::Bytes(3));
        let converter = Converter::with_options(Identity::new(), options).unwrap();
        let mut out = Vec::new();
        let written = converter
            .convert_stream(Cursor::new(b"reader to writer"), &mut out)
            .unwrap();
        assert_eq!(written, 16);
        assert_eq!(out, b"reader to writer");
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = FilterOptions::new().input_buffer_length(BufferLength::Bytes(0));
        let err = Converter::with_options(Identity::new(), options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
