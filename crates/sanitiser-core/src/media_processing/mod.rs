//! Image sanitisation: decoding, colour normalisation, metadata stripping
//!
//! - Format detection from magic bytes and decoder limits
//! - Colour normalisation to opaque RGB (alpha is flattened)
//! - Per-format re-encoding strategies with an explicit fallback table
//! - Residual metadata inspection of the encoded output

pub mod metadata;
pub mod normalize;
pub mod strategy;
pub mod types;
pub mod validation;

// Re-export commonly used types and functions
pub use metadata::{
    MetadataSegment, decode, encode_sanitized, metadata_segments, normalize_decoded,
    sanitize_image,
};
pub use strategy::{EncodeStrategy, strategy_for};
pub use types::{
    ColorMode, DecodedImage, MediaProcessingError, SanitizeOptions, SanitizedImage,
};
