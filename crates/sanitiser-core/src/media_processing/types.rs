//! Shared types and constants for image sanitisation

use std::fmt;

use image::{ColorType, DynamicImage, ImageFormat};

use crate::media_processing::validation::mime_type;
use crate::sanitizer::Stage;

/// Default JPEG quality used when re-encoding JPEG sources
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default background colour transparent pixels are flattened against (white)
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Maximum image dimension (width or height) accepted by the decoder
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

/// Maximum memory the decoder may allocate for a single image (512MB)
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// Options for sanitising a single image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// JPEG quality (1-100) used when the output is JPEG (default: 95)
    pub jpeg_quality: u8,
    /// RGB colour transparent pixels are composited against (default: white)
    pub background: [u8; 3],
    /// Bake the EXIF orientation into the pixels before the EXIF block is dropped (default: true)
    pub apply_orientation: bool,
    /// Maximum width or height the decoder accepts (default: [`MAX_IMAGE_DIMENSION`])
    pub max_dimension: u32,
    /// Maximum bytes the decoder may allocate (default: [`MAX_DECODE_ALLOC`])
    pub max_decode_alloc: u64,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            background: DEFAULT_BACKGROUND,
            apply_orientation: true,
            max_dimension: MAX_IMAGE_DIMENSION,
            max_decode_alloc: MAX_DECODE_ALLOC,
        }
    }
}

/// Pixel layout of a decoded image.
///
/// Palette images never show up here: decoders expand indexed colour into
/// [`ColorMode::Rgb`] or [`ColorMode::Rgba`] before handing out pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Single grey channel
    Luma,
    /// Grey plus alpha
    LumaAlpha,
    /// Three colour channels
    Rgb,
    /// Three colour channels plus alpha
    Rgba,
    /// Any layout not listed above
    Other,
}

impl ColorMode {
    /// Whether the layout carries an alpha channel
    pub fn has_alpha(&self) -> bool {
        matches!(self, Self::LumaAlpha | Self::Rgba)
    }
}

impl From<ColorType> for ColorMode {
    fn from(color: ColorType) -> Self {
        match color {
            ColorType::L8 | ColorType::L16 => Self::Luma,
            ColorType::La8 | ColorType::La16 => Self::LumaAlpha,
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => Self::Rgb,
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => Self::Rgba,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Luma => write!(f, "L"),
            Self::LumaAlpha => write!(f, "LA"),
            Self::Rgb => write!(f, "RGB"),
            Self::Rgba => write!(f, "RGBA"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// An image decoded from fetched bytes, owned by the record being processed
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Container format detected from the magic bytes
    pub format: ImageFormat,
    /// Decoded pixels
    pub image: DynamicImage,
}

impl DecodedImage {
    /// Pixel layout of the decoded image
    pub fn color_mode(&self) -> ColorMode {
        self.image.color().into()
    }

    /// Image dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// A re-encoded image with no metadata segments and an opaque RGB layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedImage {
    /// Encoded bytes
    pub data: Vec<u8>,
    /// Format of `data`
    pub format: ImageFormat,
    /// Format of the source image
    pub source_format: ImageFormat,
    /// Pixel layout of `data`, always [`ColorMode::Rgb`]
    pub color_mode: ColorMode,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SanitizedImage {
    /// Whether the output had to use a different container than the source
    pub fn is_fallback(&self) -> bool {
        self.format != self.source_format
    }

    /// MIME type of the encoded bytes
    pub fn mime_type(&self) -> &'static str {
        mime_type(self.format)
    }
}

/// Errors that can occur while sanitising an image
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaProcessingError {
    /// Format could not be determined from the data
    #[error("Could not determine image format")]
    UnknownFormat,

    /// Content is not a valid image of its detected format
    #[error("Failed to decode image: {reason}")]
    Decode {
        /// The reason given by the decoder
        reason: String,
    },

    /// Re-encoding failed
    #[error("Failed to encode {format}: {reason}")]
    Encode {
        /// Target format name
        format: String,
        /// The reason given by the encoder
        reason: String,
    },

    /// The encoded output still carries metadata segments
    #[error("Encoded {format} still carries metadata: {segments}")]
    ResidualMetadata {
        /// Target format name
        format: String,
        /// Comma separated list of the segments found
        segments: String,
    },
}

impl MediaProcessingError {
    /// The pipeline stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnknownFormat | Self::Decode { .. } => Stage::Decoding,
            Self::Encode { .. } | Self::ResidualMetadata { .. } => Stage::Encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_options_default() {
        let options = SanitizeOptions::default();
        assert_eq!(options.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(options.background, [255, 255, 255]);
        assert!(options.apply_orientation);
        assert_eq!(options.max_dimension, MAX_IMAGE_DIMENSION);
        assert_eq!(options.max_decode_alloc, MAX_DECODE_ALLOC);
    }

    #[test]
    fn test_color_mode_from_color_type() {
        assert_eq!(ColorMode::from(ColorType::L8), ColorMode::Luma);
        assert_eq!(ColorMode::from(ColorType::La16), ColorMode::LumaAlpha);
        assert_eq!(ColorMode::from(ColorType::Rgb8), ColorMode::Rgb);
        assert_eq!(ColorMode::from(ColorType::Rgba32F), ColorMode::Rgba);
        assert!(ColorMode::Rgba.has_alpha());
        assert!(ColorMode::LumaAlpha.has_alpha());
        assert!(!ColorMode::Rgb.has_alpha());
        assert!(!ColorMode::Luma.has_alpha());
    }

    #[test]
    fn test_error_stage() {
        assert_eq!(MediaProcessingError::UnknownFormat.stage(), Stage::Decoding);
        assert_eq!(
            MediaProcessingError::Decode {
                reason: "bad".to_string()
            }
            .stage(),
            Stage::Decoding
        );
        assert_eq!(
            MediaProcessingError::Encode {
                format: "Png".to_string(),
                reason: "bad".to_string()
            }
            .stage(),
            Stage::Encoding
        );
        assert_eq!(
            MediaProcessingError::ResidualMetadata {
                format: "Jpeg".to_string(),
                segments: "EXIF".to_string()
            }
            .stage(),
            Stage::Encoding
        );
    }

    #[test]
    fn test_sanitized_image_fallback() {
        let image = SanitizedImage {
            data: vec![1],
            format: ImageFormat::Png,
            source_format: ImageFormat::Gif,
            color_mode: ColorMode::Rgb,
            width: 1,
            height: 1,
        };
        assert!(image.is_fallback());
        assert_eq!(image.mime_type(), "image/png");

        let same = SanitizedImage {
            source_format: ImageFormat::Png,
            ..image
        };
        assert!(!same.is_fallback());
    }
}
