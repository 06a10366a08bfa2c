//! Selecting codecs by name at runtime.
use std::{fmt, str::FromStr};

use crate::{
    codec::{Codec, CodecState, ProcessResult},
    codecs::Identity,
    CodecError, CodecResult, LengthBounds,
};
#[cfg(feature = "lz4")]
use crate::codecs::{Lz4Decoder, Lz4Encoder};
#[cfg(feature = "zstd")]
use crate::codecs::{ZstdDecoder, ZstdEncoder};

/// Compression formats supported by this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Identity,
    #[cfg(feature = "zstd")]
    Zstd,
    #[cfg(feature = "lz4")]
    Lz4,
}

impl Format {
    /// Every format compiled into this build.
    pub fn all() -> Vec<Format> {
        #[allow(unused_mut)]
        let mut formats = vec![Format::Identity];
        #[cfg(feature = "zstd")]
        formats.push(Format::Zstd);
        #[cfg(feature = "lz4")]
        formats.push(Format::Lz4);
        formats
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Identity => "none",
            #[cfg(feature = "zstd")]
            Format::Zstd => "zstd",
            #[cfg(feature = "lz4")]
            Format::Lz4 => "lz4",
        }
    }

    /// An encoder for this format with default parameters.
    pub fn encoder(self) -> Encoder {
        match self {
            Format::Identity => Encoder::Identity(Identity::new()),
            #[cfg(feature = "zstd")]
            Format::Zstd => Encoder::Zstd(ZstdEncoder::new()),
            #[cfg(feature = "lz4")]
            Format::Lz4 => Encoder::Lz4(Lz4Encoder::new()),
        }
    }

    pub fn decoder(self) -> Decoder {
        match self {
            Format::Identity => Decoder::Identity(Identity::new()),
            #[cfg(feature = "zstd")]
            Format::Zstd => Decoder::Zstd(ZstdDecoder::new()),
            #[cfg(feature = "lz4")]
            Format::Lz4 => Decoder::Lz4(Lz4Decoder::new()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "identity" => Ok(Format::Identity),
            #[cfg(feature = "zstd")]
            "zstd" | "zst" => Ok(Format::Zstd),
            #[cfg(feature = "lz4")]
            "lz4" => Ok(Format::Lz4),
            _ => Err(CodecError::UnknownFormat(s.to_owned())),
        }
    }
}

/// Generates a codec enum that dispatches to one codec per variant, along with its state enum.
macro_rules! dispatch_codec {
    (
        $(#[$outer:meta])*
        $name:ident {
            $( $(#[$attr:meta])* $variant:ident($codec:ty) ),* $(,)?
        }
    ) => {
        paste::paste! {
            $(#[$outer])*
            #[derive(Debug, Clone)]
            pub enum $name {
                $( $(#[$attr])* $variant($codec), )*
            }

            #[doc = "Per-stream state of a [`" $name "`]."]
            pub enum [<$name State>] {
                $( $(#[$attr])* $variant(<$codec as Codec>::State), )*
            }

            impl Codec for $name {
                type State = [<$name State>];

                fn name(&self) -> &'static str {
                    match self {
                        $( $(#[$attr])* $name::$variant(codec) => codec.name(), )*
                    }
                }

                fn validate(&self) -> CodecResult<()> {
                    match self {
                        $( $(#[$attr])* $name::$variant(codec) => codec.validate(), )*
                    }
                }

                fn create_state(&self) -> CodecResult<Self::State> {
                    match self {
                        $( $(#[$attr])* $name::$variant(codec) => {
                            codec.create_state().map([<$name State>]::$variant)
                        } )*
                    }
                }

                fn input_bounds(&self) -> LengthBounds {
                    match self {
                        $( $(#[$attr])* $name::$variant(codec) => codec.input_bounds(), )*
                    }
                }

                fn output_bounds(&self) -> LengthBounds {
                    match self {
                        $( $(#[$attr])* $name::$variant(codec) => codec.output_bounds(), )*
                    }
                }
            }

            impl CodecState for [<$name State>] {
                fn process(&mut self, src: &[u8], dst: &mut [u8]) -> CodecResult<ProcessResult> {
                    match self {
                        $( $(#[$attr])* [<$name State>]::$variant(state) => state.process(src, dst), )*
                    }
                }

                fn flush(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
                    match self {
                        $( $(#[$attr])* [<$name State>]::$variant(state) => state.flush(dst), )*
                    }
                }

                fn finish(&mut self, dst: &mut [u8]) -> CodecResult<ProcessResult> {
                    match self {
                        $( $(#[$attr])* [<$name State>]::$variant(state) => state.finish(dst), )*
                    }
                }

                fn min_output_len(&self) -> usize {
                    match self {
                        $( $(#[$attr])* [<$name State>]::$variant(state) => state.min_output_len(), )*
                    }
                }
            }

            $(
                $(#[$attr])*
                impl From<$codec> for $name {
                    fn from(codec: $codec) -> Self {
                        $name::$variant(codec)
                    }
                }
            )*
        }
    };
}

dispatch_codec! {
    /// Any of the encoders compiled into this build.
    Encoder {
        Identity(Identity),
        #[cfg(feature = "zstd")]
        Zstd(ZstdEncoder),
        #[cfg(feature = "lz4")]
        Lz4(Lz4Encoder),
    }
}

dispatch_codec! {
    /// Any of the decoders compiled into this build.
    Decoder {
        Identity(Identity),
        #[cfg(feature = "zstd")]
        Zstd(ZstdDecoder),
        #[cfg(feature = "lz4")]
        Lz4(Lz4Decoder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Converter;
    use assert_matches::assert_matches;

    #[test]
    fn names_parse_back() {
        for format in Format::all() {
            assert_eq!(format.name().parse::<Format>().unwrap(), format);
            assert_eq!(format.to_string(), format.name());
        }
        assert_eq!("NONE".parse::<Format>().unwrap(), Format::Identity);
    }

    #[test]
    fn unknown_names_are_usage_errors() {
        let err = "brotli".parse::<Format>().unwrap_err();
        assert_matches!(&err, CodecError::UnknownFormat(name) if name == "brotli");
        assert_eq!(err.kind(), crate::ErrorKind::Usage);
    }

    #[test]
    fn every_format_round_trips() {
        let data: Vec<u8> = b"format registry ".repeat(1000);
        for format in Format::all() {
            let encoded = Converter::new(format.encoder()).convert(&data).unwrap();
            let decoded = Converter::new(format.decoder()).convert(&encoded).unwrap();
            assert_eq!(decoded, data, "{format}");
            assert_eq!(format.encoder().name(), format.name());
        }
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn configured_codecs_convert_into_dispatchers() {
        let encoder: Encoder = ZstdEncoder::new().level(1).into();
        assert_matches!(&encoder, Encoder::Zstd(zstd) if zstd.get_level() == 1);
    }
}
