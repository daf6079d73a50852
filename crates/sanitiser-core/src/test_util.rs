//! Image fixtures for unit tests

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgb};

/// Create a test PNG image with specified dimensions
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode_gradient(width, height, ImageFormat::Png)
}

/// Create a test JPEG image with specified dimensions
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_gradient(width, height, ImageFormat::Jpeg)
}

fn encode_gradient(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128u8])
    });
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), format).unwrap();
    data
}

/// Minimal little-endian TIFF structure holding a single Orientation tag
pub fn exif_tiff_with_orientation(orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    // IFD0 with one entry
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    // No next IFD
    tiff.extend_from_slice(&0u32.to_le_bytes());
    tiff
}

/// Create a JPEG carrying an EXIF APP1 segment with the given orientation
pub fn jpeg_with_exif_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let jpeg = create_test_jpeg(width, height);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&exif_tiff_with_orientation(orientation));

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Create a PNG carrying tEXt, zTXt, tIME and eXIf chunks ahead of the image data
pub fn png_with_metadata_chunks(width: u32, height: u32) -> Vec<u8> {
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|i| [(i % 256) as u8, 64, 192])
        .collect();

    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder
        .add_text_chunk("Author".to_string(), "Jane Doe".to_string())
        .unwrap();
    encoder
        .add_ztxt_chunk("Comment".to_string(), "shot at home".to_string())
        .unwrap();

    let mut writer = encoder.write_header().unwrap();
    writer
        .write_chunk(png::chunk::ChunkType(*b"tIME"), &[0x07, 0xE8, 1, 2, 3, 4, 5])
        .unwrap();
    writer
        .write_chunk(png::chunk::ChunkType(*b"eXIf"), &exif_tiff_with_orientation(1))
        .unwrap();
    writer.write_image_data(&pixels).unwrap();
    writer.finish().unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_decode() {
        assert!(image::load_from_memory(&jpeg_with_exif_orientation(8, 4, 6)).is_ok());
        assert!(image::load_from_memory(&png_with_metadata_chunks(8, 4)).is_ok());
    }
}
