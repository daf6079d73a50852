//! Format detection and decoder limits
//!
//! Formats are always detected from the magic bytes of the fetched object,
//! never from the key's extension or a stored content type.

use image::{ImageFormat, Limits};

use crate::media_processing::types::{MediaProcessingError, SanitizeOptions};

/// Detect the image format from the leading bytes of `data`
///
/// # Errors
/// * `UnknownFormat` - If the data does not start with a known image signature
pub fn detect_format(data: &[u8]) -> Result<ImageFormat, MediaProcessingError> {
    image::guess_format(data).map_err(|_| MediaProcessingError::UnknownFormat)
}

/// MIME type for a format, used as the content type of uploaded objects
pub fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Tga => "image/x-tga",
        ImageFormat::Pnm => "image/x-portable-anymap",
        ImageFormat::Farbfeld => "image/x-farbfeld",
        ImageFormat::Avif => "image/avif",
        ImageFormat::Qoi => "image/qoi",
        _ => "application/octet-stream",
    }
}

/// Decoder limits derived from the sanitise options
///
/// These bound width, height and total allocation so a small crafted file
/// cannot expand into an image that exhausts the invocation's memory.
pub(crate) fn decode_limits(options: &SanitizeOptions) -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(options.max_dimension);
    limits.max_image_height = Some(options.max_dimension);
    limits.max_alloc = Some(options.max_decode_alloc);
    limits
}
