//! Snapshot export: trimming and data url encoding.

use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{Result, SkinError};

pub const DEFAULT_MIME: &str = "image/png";

/// Crops `image` to the bounding box of its non transparent pixels.
///
/// Fully transparent images are returned unchanged.
pub fn trim_transparent(image: &RgbaImage) -> RgbaImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    match bounds {
        Some((x0, y0, x1, y1)) => {
            image::imageops::crop_imm(image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => image.clone(),
    }
}

/// Encodes `image` as `data:<mime>;base64,...`.
pub fn encode_data_url(image: RgbaImage, mime: &str) -> Result<String> {
    let format = ImageFormat::from_mime_type(mime)
        .filter(|format| format.writing_enabled())
        .ok_or_else(|| SkinError::UnsupportedMime(mime.to_string()))?;
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8()),
        _ => DynamicImage::ImageRgba8(image),
    };
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .map_err(SkinError::Encode)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes.into_inner());
    Ok(format!("data:{mime};base64,{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn trims_to_opaque_bounds() {
        let mut image = RgbaImage::new(10, 8);
        image.put_pixel(2, 3, Rgba([255, 0, 0, 255]));
        image.put_pixel(6, 5, Rgba([0, 255, 0, 10]));
        let trimmed = trim_transparent(&image);
        assert_eq!(trimmed.dimensions(), (5, 3));
        assert_eq!(trimmed.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn fully_transparent_images_are_kept() {
        let image = RgbaImage::new(4, 4);
        assert_eq!(trim_transparent(&image).dimensions(), (4, 4));
    }

    #[test]
    fn encodes_png_data_urls() {
        let url = encode_data_url(RgbaImage::new(2, 2), DEFAULT_MIME).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn rejects_unknown_mime_types() {
        assert!(matches!(
            encode_data_url(RgbaImage::new(1, 1), "image/x-nope"),
            Err(SkinError::UnsupportedMime(_))
        ));
    }
}
