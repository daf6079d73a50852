//! Colour-mode normalisation
//!
//! Every sanitised image leaves this module as opaque 8-bit RGB. Alpha is
//! composited against a solid background and then discarded.

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

/// Convert `img` to opaque 8-bit RGB.
///
/// Images that are already `Rgb8` are returned without touching the pixels.
/// Images with an alpha channel are flattened against `background`; all
/// others (grey, 16-bit, float) are converted directly.
pub fn normalize_color(img: DynamicImage, background: [u8; 3]) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        img if img.color().has_alpha() => flatten_alpha(&img.to_rgba8(), background),
        img => img.to_rgb8(),
    }
}

/// Composite `rgba` over a solid `background`.
///
/// A fully transparent pixel becomes exactly `background`, a fully opaque
/// one keeps its colour.
pub fn flatten_alpha(rgba: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([
            blend(r, background[0], a),
            blend(g, background[1], a),
            blend(b, background[2], a),
        ])
    })
}

fn blend(src: u8, bg: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8
}
