//! Decoding, metadata stripping and residual-metadata inspection
//!
//! Stripping works by throwing the container away: pixels are decoded,
//! normalised to opaque RGB and written into a fresh container by an encoder
//! that emits no EXIF, ICC, XMP, comment or text segments. The result is then
//! scanned with [`metadata_segments`] so an encoder that starts emitting such
//! segments is caught instead of silently leaking them.

use std::fmt;
use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};

use crate::media_processing::normalize::normalize_color;
use crate::media_processing::strategy::strategy_for;
use crate::media_processing::types::{
    ColorMode, DecodedImage, MediaProcessingError, SanitizeOptions, SanitizedImage,
};
use crate::media_processing::validation::{decode_limits, detect_format};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A metadata-bearing segment found in an encoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSegment {
    /// EXIF block (JPEG APP1, PNG eXIf, WebP EXIF)
    Exif,
    /// Embedded colour profile (JPEG APP2, PNG iCCP, WebP ICCP)
    Icc,
    /// XMP packet
    Xmp,
    /// Photoshop / IPTC block (JPEG APP13)
    Iptc,
    /// JFIF extension thumbnail (JPEG APP0 JFXX)
    Thumbnail,
    /// Free-form comment (JPEG COM)
    Comment,
    /// Text chunk (PNG tEXt, zTXt, iTXt)
    Text,
    /// Last-modification time (PNG tIME)
    Time,
    /// Any other application segment or ancillary chunk
    Other(String),
}

impl fmt::Display for MetadataSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exif => write!(f, "EXIF"),
            Self::Icc => write!(f, "ICC"),
            Self::Xmp => write!(f, "XMP"),
            Self::Iptc => write!(f, "IPTC"),
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Comment => write!(f, "comment"),
            Self::Text => write!(f, "text"),
            Self::Time => write!(f, "time"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Decode `data` into pixels, detecting the format from its magic bytes
///
/// # Errors
/// * `UnknownFormat` - If the format cannot be determined
/// * `Decode` - If the content is not a valid image or exceeds the decoder limits
pub fn decode(
    data: &[u8],
    options: &SanitizeOptions,
) -> Result<DecodedImage, MediaProcessingError> {
    let format = detect_format(data)?;

    let mut reader = ImageReader::with_format(Cursor::new(data), format);
    reader.limits(decode_limits(options));

    let image = reader.decode().map_err(|e| MediaProcessingError::Decode {
        reason: e.to_string(),
    })?;

    Ok(DecodedImage { format, image })
}

/// Produce a metadata-free re-encoding of `data`
///
/// Runs [`decode`], [`normalize_decoded`] and [`encode_sanitized`] in order.
///
/// # Errors
/// * `UnknownFormat` / `Decode` - If `data` is not a decodable image
/// * `Encode` - If the encoder fails
/// * `ResidualMetadata` - If the output still carries metadata segments
pub fn sanitize_image(
    data: &[u8],
    options: &SanitizeOptions,
) -> Result<SanitizedImage, MediaProcessingError> {
    let decoded = decode(data, options)?;
    let source_format = decoded.format;
    let rgb = normalize_decoded(data, decoded, options);
    encode_sanitized(&rgb, source_format, options)
}

/// Bake in the EXIF orientation of `data` (if enabled) and flatten to opaque RGB
pub fn normalize_decoded(
    data: &[u8],
    decoded: DecodedImage,
    options: &SanitizeOptions,
) -> RgbImage {
    let image = if options.apply_orientation {
        apply_exif_orientation(data, decoded.image)
    } else {
        decoded.image
    };
    normalize_color(image, options.background)
}

/// Encode `rgb` with the strategy for `source_format` and verify the result
/// carries no metadata segments
///
/// # Errors
/// * `Encode` - If the encoder fails
/// * `ResidualMetadata` - If the output still carries metadata segments
pub fn encode_sanitized(
    rgb: &RgbImage,
    source_format: ImageFormat,
    options: &SanitizeOptions,
) -> Result<SanitizedImage, MediaProcessingError> {
    let strategy = strategy_for(source_format);
    let format = strategy.output_format();
    let encoded = strategy.encode(rgb, options)?;

    let residual = metadata_segments(&encoded);
    if !residual.is_empty() {
        return Err(MediaProcessingError::ResidualMetadata {
            format: format!("{format:?}"),
            segments: residual
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    Ok(SanitizedImage {
        data: encoded,
        format,
        source_format,
        color_mode: ColorMode::Rgb,
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Apply EXIF orientation transform to an image
///
/// Reads the EXIF orientation tag from the original image data and applies
/// the matching rotation and/or flip, so the image displays the same way once
/// the EXIF block is gone.
///
/// EXIF Orientation values:
/// 1 = Normal
/// 2 = Flip horizontal
/// 3 = Rotate 180°
/// 4 = Flip vertical
/// 5 = Transpose (Rotate 90° CW, then flip horizontal)
/// 6 = Rotate 90° CW
/// 7 = Transverse (Rotate 270° CW, then flip horizontal)
/// 8 = Rotate 270° CW
pub(crate) fn apply_exif_orientation(data: &[u8], img: DynamicImage) -> DynamicImage {
    let Ok(exif) = Reader::new().read_from_container(&mut Cursor::new(data)) else {
        return img;
    };

    let Some(orientation) = exif
        .get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
    else {
        return img;
    };

    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// List the metadata-bearing segments in an encoded JPEG, PNG or WebP image.
///
/// Other containers, and data that is not an image, yield an empty list.
pub fn metadata_segments(data: &[u8]) -> Vec<MetadataSegment> {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => jpeg_segments(data),
        Ok(ImageFormat::Png) => png_segments(data),
        Ok(ImageFormat::WebP) => webp_segments(data),
        _ => Vec::new(),
    }
}

fn jpeg_segments(data: &[u8]) -> Vec<MetadataSegment> {
    let mut found = Vec::new();
    // Skip SOI
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Standalone markers
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            // Start of scan / end of image: no more headers
            0xDA | 0xD9 => break,
            _ => {}
        }

        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 {
            break;
        }
        let start = pos + 4;
        let end = (pos + 2 + len).min(data.len());
        let payload = &data[start.min(end)..end];

        match marker {
            0xE0 if payload.starts_with(b"JFXX\0") => found.push(MetadataSegment::Thumbnail),
            0xE0 => {}
            0xE1 if payload.starts_with(b"Exif\0") => found.push(MetadataSegment::Exif),
            0xE1 if payload.starts_with(b"http://ns.adobe.com/xap/1.0/") => {
                found.push(MetadataSegment::Xmp)
            }
            0xE2 if payload.starts_with(b"ICC_PROFILE\0") => found.push(MetadataSegment::Icc),
            0xED => found.push(MetadataSegment::Iptc),
            0xE1..=0xEF => found.push(MetadataSegment::Other(format!("APP{}", marker - 0xE0))),
            0xFE => found.push(MetadataSegment::Comment),
            _ => {}
        }

        pos += 2 + len;
    }

    found
}

fn png_segments(data: &[u8]) -> Vec<MetadataSegment> {
    let mut found = Vec::new();
    if !data.starts_with(PNG_SIGNATURE) {
        return found;
    }
    let mut pos = PNG_SIGNATURE.len();

    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let chunk_type = &data[pos + 4..pos + 8];

        match chunk_type {
            b"IEND" => break,
            b"eXIf" => found.push(MetadataSegment::Exif),
            b"iCCP" => found.push(MetadataSegment::Icc),
            b"tEXt" | b"zTXt" | b"iTXt" => found.push(MetadataSegment::Text),
            b"tIME" => found.push(MetadataSegment::Time),
            // Ancillary chunks have a lower-case first letter
            other if other[0].is_ascii_lowercase() => found.push(MetadataSegment::Other(
                String::from_utf8_lossy(other).into_owned(),
            )),
            _ => {}
        }

        // length + type + data + crc
        pos = match pos.checked_add(12).and_then(|p| p.checked_add(len)) {
            Some(next) => next,
            None => break,
        };
    }

    found
}

fn webp_segments(data: &[u8]) -> Vec<MetadataSegment> {
    let mut found = Vec::new();
    // RIFF header: "RIFF" <size> "WEBP"
    let mut pos = 12;

    while pos + 8 <= data.len() {
        let fourcc = &data[pos..pos + 4];
        let len = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
            as usize;

        match fourcc {
            b"EXIF" => found.push(MetadataSegment::Exif),
            b"ICCP" => found.push(MetadataSegment::Icc),
            b"XMP " => found.push(MetadataSegment::Xmp),
            _ => {}
        }

        // Chunks are padded to an even size
        let padded = len + (len & 1);
        pos = match pos.checked_add(8).and_then(|p| p.checked_add(padded)) {
            Some(next) => next,
            None => break,
        };
    }

    found
}
