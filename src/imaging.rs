//! Image preparation before upload: square padding for background edits and
//! PNG re-encoding for variations.

use image::{imageops, DynamicImage, GenericImageView, ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Fully transparent white, used for padding
const PADDING: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Decode `bytes` and re-encode them as PNG without changing the pixels
pub fn to_png(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    encode_png(&img)
}

/// Centre the image on a transparent square canvas whose side is the larger
/// of width and height, and return it as PNG.
pub fn pad_to_square(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let (width, height) = img.dimensions();
    let size = width.max(height);

    let mut canvas = RgbaImage::from_pixel(size, size, PADDING);
    let x = (size - width) / 2;
    let y = (size - height) / 2;
    // Copy, not blend: transparent source pixels keep their colour
    imageops::replace(&mut canvas, &img.to_rgba8(), i64::from(x), i64::from(y));

    encode_png(&DynamicImage::ImageRgba8(canvas))
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Png)?;
    Ok(buffer.into_inner())
}
