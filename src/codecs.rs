//! Concrete codecs.
//!
//! [`Identity`] is always available. The native codecs are gated behind the `zstd` and `lz4`
//! features, both enabled by default.
mod identity;
#[cfg(feature = "lz4")]
mod lz4;
#[cfg(feature = "zstd")]
mod zstd;

pub use identity::{Identity, IdentityState};
#[cfg(feature = "lz4")]
pub use self::lz4::{Lz4BlockSize, Lz4Decoder, Lz4DecoderState, Lz4Encoder, Lz4EncoderState};
#[cfg(feature = "zstd")]
pub use self::zstd::{ZstdDecoder, ZstdDecoderState, ZstdEncoder, ZstdEncoderState};
