//! Map fixtures: drawing location pins and synthesizing simple zone maps.

use crate::core::preprocess::flatten_alpha;
use crate::utils::error::Result;
use image::{Rgb, RgbImage};
use std::path::Path;

pub const PURPLE: Rgb<u8> = Rgb([128, 0, 128]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Quadrant colors of the synthetic region map: red, green, blue, yellow.
pub const ZONE_COLORS: [Rgb<u8>; 4] = [
    Rgb([255, 0, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 255, 0]),
];

const OUTLINE_WIDTH: i64 = 4;

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u64) < img.width() as u64 && (y as u64) < img.height() as u64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_circle(img: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    for y in y0..y1 {
        for x in x0..x1 {
            put(img, x, y, color);
        }
    }
}

/// Downward triangle from `(cx, top)` widening to `half_width` at `top + height`.
fn fill_tail(img: &mut RgbImage, cx: i64, top: i64, half_width: i64, height: i64, color: Rgb<u8>) {
    for row in 0..=height {
        let half = half_width * row / height.max(1);
        for dx in -half..=half {
            put(img, cx + dx, top + row, color);
        }
    }
}

/// Purple pin with a black outline and white center, tail pointing down.
pub fn draw_pin(img: &mut RgbImage, x: i64, y: i64, radius: i64) {
    let tail_half = (radius * 5 / 8).max(1);
    let tail_height = radius * 5 / 4;

    fill_tail(img, x, y + radius - OUTLINE_WIDTH, tail_half + 1, tail_height + 1, BLACK);
    fill_tail(img, x, y + radius - OUTLINE_WIDTH, tail_half, tail_height, PURPLE);
    fill_circle(img, x, y, radius, BLACK);
    fill_circle(img, x, y, (radius - OUTLINE_WIDTH).max(1), PURPLE);
    fill_circle(img, x, y, (radius * 3 / 8).max(1), WHITE);
}

/// Small solid black pin, the marker used on synthetic pin maps.
pub fn draw_simple_pin(img: &mut RgbImage, x: i64, y: i64) {
    fill_circle(img, x, y, 10, BLACK);
    fill_tail(img, x, y + 10, 10, 10, BLACK);
}

pub fn add_pin_to_map(source: &Path, output: &Path, x: i64, y: i64) -> Result<()> {
    let mut img = flatten_alpha(image::open(source)?).to_rgb8();
    draw_pin(&mut img, x, y, 40);
    img.save(output)?;

    tracing::info!("📌 Created {} with pin at ({}, {})", output.display(), x, y);
    Ok(())
}

/// Four colored quadrants with a swatch legend in the upper right.
pub fn synthesize_region_map(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, WHITE);
    let (w, h) = (width as i64, height as i64);

    fill_rect(&mut img, 0, 0, w / 2, h / 2, ZONE_COLORS[0]);
    fill_rect(&mut img, w / 2, 0, w, h / 2, ZONE_COLORS[1]);
    fill_rect(&mut img, 0, h / 2, w / 2, h, ZONE_COLORS[2]);
    fill_rect(&mut img, w / 2, h / 2, w, h, ZONE_COLORS[3]);

    // 圖例：白底加上各區顏色方塊
    let legend_x = w * 13 / 16;
    let legend_y = h / 12;
    fill_rect(
        &mut img,
        legend_x - 6,
        legend_y - 6,
        legend_x + 42,
        legend_y + 30 * ZONE_COLORS.len() as i64,
        WHITE,
    );
    for (i, color) in ZONE_COLORS.iter().enumerate() {
        let top = legend_y + 30 * i as i64;
        fill_rect(&mut img, legend_x, top, legend_x + 30, top + 20, *color);
    }

    img
}

pub fn synthesize_pin_map(region: &RgbImage, x: i64, y: i64) -> RgbImage {
    let mut pin_map = region.clone();
    draw_simple_pin(&mut pin_map, x, y);
    pin_map
}
