//! Image preparation for vision models that struggle with raw browser screenshots.

use crate::domain::model::ImageMetadata;
use crate::utils::error::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Longest side after preprocessing.
pub const MAX_DIMENSION: u32 = 800;

const CONTRAST_BOOST: f32 = 50.0;
const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;

pub fn encode_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Composite any alpha channel onto a white background.
pub fn flatten_alpha(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img;
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    DynamicImage::ImageRgb8(rgb)
}

/// Drop 10% at the top and bottom and 5% at each side (browser chrome, map controls).
pub fn crop_to_map(img: &DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    let left = (width as f64 * 0.05) as u32;
    let right = (width as f64 * 0.95) as u32;
    let top = (height as f64 * 0.1) as u32;
    let bottom = (height as f64 * 0.9) as u32;

    img.crop_imm(left, top, right.saturating_sub(left).max(1), bottom.saturating_sub(top).max(1))
}

fn shrink_to_fit(img: DynamicImage) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        img.resize(
            MAX_DIMENSION,
            MAX_DIMENSION,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Crop, shrink, enhance and PNG-encode an image; returns base64 data and sizes.
///
/// When `debug_dir` is set, the cropped and enhanced intermediates are written
/// there as `debug_cropped.png` and `debug_enhanced.png`.
pub fn preprocess_image(path: &Path, debug_dir: Option<&Path>) -> Result<(String, ImageMetadata)> {
    let img = flatten_alpha(image::open(path)?);
    let mut metadata = ImageMetadata {
        original_size: Some(img.dimensions()),
        ..ImageMetadata::default()
    };

    let cropped = shrink_to_fit(crop_to_map(&img));
    let enhanced = cropped
        .adjust_contrast(CONTRAST_BOOST)
        .unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD);

    if let Some(dir) = debug_dir {
        std::fs::create_dir_all(dir)?;
        cropped.save(dir.join("debug_cropped.png"))?;
        enhanced.save(dir.join("debug_enhanced.png"))?;
        tracing::info!(
            "🐛 Debug images saved: {}, {}",
            dir.join("debug_cropped.png").display(),
            dir.join("debug_enhanced.png").display()
        );
    }

    let png = encode_png(&enhanced)?;
    metadata.processed_size = Some(enhanced.dimensions());
    metadata.file_size_kb = Some(png.len() as f64 / 1024.0);

    Ok((base64::engine::general_purpose::STANDARD.encode(png), metadata))
}

/// Preprocess, falling back to the untouched file when the image cannot be decoded.
pub fn encode_for_vision(path: &Path, debug_dir: Option<&Path>) -> Result<(String, ImageMetadata)> {
    match preprocess_image(path, debug_dir) {
        Ok(encoded) => Ok(encoded),
        Err(e) => {
            tracing::warn!(
                "⚠️ Preprocessing {} failed ({}), sending original bytes",
                path.display(),
                e
            );
            Ok((encode_file(path)?, ImageMetadata::default()))
        }
    }
}
