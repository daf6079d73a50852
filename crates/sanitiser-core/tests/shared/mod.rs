//! Fixtures shared by the handler integration tests

#![allow(dead_code)]

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgb, Rgba, RgbaImage};
use serde_json::{Value, json};

pub const SOURCE_BUCKET: &str = "uploads";
pub const DESTINATION_BUCKET: &str = "sanitised";

/// An S3 `ObjectCreated:Put` record for `key` in the source bucket
pub fn created_record(key: &str) -> Value {
    json!({
        "eventVersion": "2.1",
        "eventSource": "aws:s3",
        "eventName": "ObjectCreated:Put",
        "s3": {
            "bucket": { "name": SOURCE_BUCKET },
            "object": { "key": key }
        }
    })
}

/// An S3 event document holding `records`
pub fn event(records: Vec<Value>) -> Value {
    json!({ "Records": records })
}

pub fn rgb_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 90u8])
    });
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)
        .unwrap();
    data
}

/// A JPEG with an EXIF block (orientation + camera make) spliced in after SOI
pub fn jpeg_with_exif(width: u32, height: u32) -> Vec<u8> {
    let jpeg = rgb_jpeg(width, height);

    let make = b"SpyCam\0";
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    // Make (ASCII), stored after the IFD
    tiff.extend_from_slice(&0x010Fu16.to_le_bytes());
    tiff.extend_from_slice(&2u16.to_le_bytes());
    tiff.extend_from_slice(&(make.len() as u32).to_le_bytes());
    tiff.extend_from_slice(&38u32.to_le_bytes());
    // Orientation = 1
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&[1, 0, 0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(tiff.len(), 38);
    tiff.extend_from_slice(make);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);

    let mut icc = b"ICC_PROFILE\0\x01\x01".to_vec();
    icc.extend_from_slice(&[0u8; 16]);

    let mut out = jpeg[..2].to_vec();
    for (marker, body) in [(0xE1u8, &payload), (0xE2u8, &icc)] {
        out.extend_from_slice(&[0xFF, marker]);
        out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(body);
    }
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// A 10x10 opaque blue RGBA PNG whose pixel (0, 0) is fully transparent
pub fn rgba_png_with_transparent_corner() -> Vec<u8> {
    let mut img: RgbaImage = ImageBuffer::from_pixel(10, 10, Rgba([0, 0, 255, 255]));
    img.put_pixel(0, 0, Rgba([255, 0, 0, 0]));
    let mut data = Vec::new();
    img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

/// Scan JPEG headers for APP1..APP15 and COM markers
pub fn jpeg_app_markers(data: &[u8]) -> Vec<u8> {
    let mut markers = Vec::new();
    let mut pos = 2;
    while pos + 4 <= data.len() && data[pos] == 0xFF {
        let marker = data[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        if (0xE1..=0xEF).contains(&marker) || marker == 0xFE {
            markers.push(marker);
        }
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 2 + len;
    }
    markers
}
