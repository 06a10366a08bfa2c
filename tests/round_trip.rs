mod common;

use common::*;

use anyhow::Result;
use codec_stream::{ChunkSink, CollectingSink, Converter, FilterOptions, Format};
use paste::paste;

/// Encodes `data` in `chunk`-sized pieces, decodes the result the same way and checks that the
/// original comes back.
fn round_trip(format: Format, options: FilterOptions, data: &[u8], chunk: usize) -> Result<()> {
    init_logging();
    let encoder = Converter::with_options(format.encoder(), options.clone())?;
    let decoder = Converter::with_options(format.decoder(), options)?;

    let mut sink = encoder.start_chunked(CollectingSink::new())?;
    for piece in data.chunks(chunk) {
        sink.add(piece)?;
    }
    sink.close()?;
    let encoded = sink.into_inner().into_bytes();

    let mut sink = decoder.start_chunked(CollectingSink::new())?;
    for piece in encoded.chunks(chunk) {
        sink.add(piece)?;
    }
    sink.close()?;
    assert!(sink.get_ref().is_closed());
    assert_eq!(sink.get_ref().bytes(), data, "{format} with {chunk}-byte chunks");
    Ok(())
}

macro_rules! round_trip_parametrized {
    ($($name:ident, $format:expr),* $(,)?) => {
        $(
            paste! {
                #[test]
                fn [<$name _empty>]() -> Result<()> {
                    round_trip($format, FilterOptions::new(), &[], 1)
                }

                #[test]
                fn [<$name _single_byte>]() -> Result<()> {
                    round_trip($format, FilterOptions::new(), b"x", 1)
                }

                #[test]
                fn [<$name _default_buffers>]() -> Result<()> {
                    round_trip($format, FilterOptions::new(), &sample_data(300_000), 10_000)
                }

                #[test]
                fn [<$name _one_byte_chunks>]() -> Result<()> {
                    round_trip($format, buffers(16, 16), &sample_data(5_000), 1)
                }

                #[test]
                fn [<$name _tiny_buffers>]() -> Result<()> {
                    round_trip($format, buffers(64, 64), &sample_data(1_000_000), 1_000_000)
                }

                #[test]
                fn [<$name _fixed_buffers>]() -> Result<()> {
                    round_trip($format, fixed_buffers(512, 256), &sample_data(200_000), 777)
                }
            }
        )*
    };
}

round_trip_parametrized!(identity, Format::Identity);
#[cfg(feature = "zstd")]
round_trip_parametrized!(zstd, Format::Zstd);
#[cfg(feature = "lz4")]
round_trip_parametrized!(lz4, Format::Lz4);

#[cfg(feature = "zstd")]
#[test]
fn zstd_levels_round_trip() -> Result<()> {
    use codec_stream::codecs::{ZstdDecoder, ZstdEncoder};

    init_logging();
    let data = sample_data(100_000);
    for level in [-5, 1, 3, 9, 19] {
        let encoded = Converter::new(ZstdEncoder::new().level(level)).convert(&data)?;
        let decoded = Converter::new(ZstdDecoder::new()).convert(&encoded)?;
        assert_eq!(decoded, data, "level {level}");
    }
    Ok(())
}

#[test]
fn empty_stream_output_decodes_to_nothing() -> Result<()> {
    init_logging();
    for format in Format::all() {
        let mut sink = Converter::new(format.encoder()).start_chunked(CollectingSink::new())?;
        sink.close()?;
        let encoded = sink.into_inner().into_bytes();
        if format != Format::Identity {
            // A valid, empty frame.
            assert!(!encoded.is_empty(), "{format}");
        }
        assert!(Converter::new(format.decoder()).convert(&encoded)?.is_empty());
    }
    Ok(())
}
