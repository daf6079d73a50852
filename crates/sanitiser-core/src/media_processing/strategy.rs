//! Per-format re-encoding strategies
//!
//! Each detected source format maps to exactly one [`EncodeStrategy`]. Formats
//! that can carry opaque RGB keep their container; the rest (GIF is palette
//! only, TIFF and the long tail are not worth a dedicated writer) fall back
//! to lossless PNG.

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};

use crate::media_processing::types::{MediaProcessingError, SanitizeOptions};

/// Re-encodes normalised RGB pixels into a container without metadata
pub trait EncodeStrategy: Send + Sync {
    /// Container produced by [`EncodeStrategy::encode`]
    fn output_format(&self) -> ImageFormat;

    /// Encode `img` using pixel data only
    fn encode(
        &self,
        img: &RgbImage,
        options: &SanitizeOptions,
    ) -> Result<Vec<u8>, MediaProcessingError>;
}

/// JPEG in, JPEG out
#[derive(Debug, Clone, Copy)]
pub struct JpegStrategy;

/// PNG in, PNG out; also the fallback container
#[derive(Debug, Clone, Copy)]
pub struct PngStrategy;

/// WebP in, lossless WebP out
#[derive(Debug, Clone, Copy)]
pub struct WebpStrategy;

/// BMP in, BMP out
#[derive(Debug, Clone, Copy)]
pub struct BmpStrategy;

static JPEG: JpegStrategy = JpegStrategy;
static PNG: PngStrategy = PngStrategy;
static WEBP: WebpStrategy = WebpStrategy;
static BMP: BmpStrategy = BmpStrategy;

/// Select the strategy for a detected source format
pub fn strategy_for(format: ImageFormat) -> &'static dyn EncodeStrategy {
    match format {
        ImageFormat::Jpeg => &JPEG,
        ImageFormat::Png => &PNG,
        ImageFormat::WebP => &WEBP,
        ImageFormat::Bmp => &BMP,
        _ => &PNG,
    }
}

fn encode_error(format: ImageFormat, err: image::ImageError) -> MediaProcessingError {
    MediaProcessingError::Encode {
        format: format!("{format:?}"),
        reason: err.to_string(),
    }
}

impl EncodeStrategy for JpegStrategy {
    fn output_format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(
        &self,
        img: &RgbImage,
        options: &SanitizeOptions,
    ) -> Result<Vec<u8>, MediaProcessingError> {
        let mut output = Vec::new();
        let quality = options.jpeg_quality.clamp(1, 100);
        JpegEncoder::new_with_quality(&mut output, quality)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| encode_error(ImageFormat::Jpeg, e))?;
        Ok(output)
    }
}

impl EncodeStrategy for PngStrategy {
    fn output_format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn encode(
        &self,
        img: &RgbImage,
        _options: &SanitizeOptions,
    ) -> Result<Vec<u8>, MediaProcessingError> {
        let mut output = Vec::new();
        PngEncoder::new(&mut output)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| encode_error(ImageFormat::Png, e))?;
        Ok(output)
    }
}

impl EncodeStrategy for WebpStrategy {
    fn output_format(&self) -> ImageFormat {
        ImageFormat::WebP
    }

    fn encode(
        &self,
        img: &RgbImage,
        _options: &SanitizeOptions,
    ) -> Result<Vec<u8>, MediaProcessingError> {
        let mut output = Vec::new();
        WebPEncoder::new_lossless(&mut output)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| encode_error(ImageFormat::WebP, e))?;
        Ok(output)
    }
}

impl EncodeStrategy for BmpStrategy {
    fn output_format(&self) -> ImageFormat {
        ImageFormat::Bmp
    }

    fn encode(
        &self,
        img: &RgbImage,
        _options: &SanitizeOptions,
    ) -> Result<Vec<u8>, MediaProcessingError> {
        let mut output = Vec::new();
        BmpEncoder::new(&mut output)
            .write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| encode_error(ImageFormat::Bmp, e))?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};

    use super::*;

    fn sample() -> RgbImage {
        ImageBuffer::from_fn(8, 6, |x, y| Rgb([(x * 30) as u8, (y * 40) as u8, 200]))
    }

    #[test]
    fn test_format_table() {
        let table = [
            (ImageFormat::Jpeg, ImageFormat::Jpeg),
            (ImageFormat::Png, ImageFormat::Png),
            (ImageFormat::WebP, ImageFormat::WebP),
            (ImageFormat::Bmp, ImageFormat::Bmp),
            (ImageFormat::Gif, ImageFormat::Png),
            (ImageFormat::Tiff, ImageFormat::Png),
            (ImageFormat::Ico, ImageFormat::Png),
        ];
        for (source, expected) in table {
            assert_eq!(
                strategy_for(source).output_format(),
                expected,
                "unexpected output for {source:?}"
            );
        }
    }

    #[test]
    fn test_each_strategy_produces_its_format() {
        let img = sample();
        let options = SanitizeOptions::default();
        for source in [
            ImageFormat::Jpeg,
            ImageFormat::Png,
            ImageFormat::WebP,
            ImageFormat::Bmp,
        ] {
            let strategy = strategy_for(source);
            let data = strategy.encode(&img, &options).unwrap();
            assert_eq!(
                image::guess_format(&data).unwrap(),
                strategy.output_format()
            );

            let decoded = image::load_from_memory(&data).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (8, 6));
        }
    }

    #[test]
    fn test_lossless_strategies_keep_pixels() {
        let img = sample();
        let options = SanitizeOptions::default();
        for strategy in [strategy_for(ImageFormat::Png), strategy_for(ImageFormat::WebP)] {
            let data = strategy.encode(&img, &options).unwrap();
            let decoded = image::load_from_memory(&data).unwrap().to_rgb8();
            assert_eq!(decoded, img);
        }
    }

    #[test]
    fn test_jpeg_quality_out_of_range_is_clamped() {
        let options = SanitizeOptions {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(JpegStrategy.encode(&sample(), &options).is_ok());
    }
}
