//! Captcha raster rendering.
//!
//! The visual perturbations (noise lines, dots, per-character rotation)
//! exist to resist trivial OCR; none of them are cryptographically
//! meaningful.

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_ellipse_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::Rng;
use std::io::Cursor;
use std::path::Path;

const WIDTH: u32 = 120;
const HEIGHT: u32 = 40;
const NOISE_LINES: usize = 5;
const NOISE_DOTS: usize = 50;
const GLYPH_SCALE: f32 = 28.0;
const MAX_ROTATION_DEG: f32 = 15.0;
/// Side of the square tile each character is drawn and rotated in
const TILE: u32 = 32;

/// Renders challenge codes into noisy PNG rasters.
pub struct CaptchaRenderer {
    font: FontArc,
}

impl CaptchaRenderer {
    /// Load the glyph font from disk. A missing or unparseable font is an
    /// environment problem and fails startup.
    pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read captcha font {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .with_context(|| format!("Failed to parse captcha font {}", path.display()))?;
        Ok(Self { font })
    }

    /// Render `code` into a `data:image/png;base64,...` URI.
    pub fn render(&self, code: &str) -> Result<String> {
        let mut rng = rand::rng();

        // Randomized light background so no two images share a canvas
        let background = Rgba([
            rng.random_range(210..=245),
            rng.random_range(210..=245),
            rng.random_range(210..=245),
            255,
        ]);
        let mut canvas = RgbaImage::from_pixel(WIDTH, HEIGHT, background);

        for _ in 0..NOISE_LINES {
            let color = random_color(&mut rng, 100, 180);
            let from = (
                rng.random_range(0..WIDTH) as f32,
                rng.random_range(0..HEIGHT) as f32,
            );
            let to = (
                rng.random_range(0..WIDTH) as f32,
                rng.random_range(0..HEIGHT) as f32,
            );
            draw_line_segment_mut(&mut canvas, from, to, color);
        }

        for _ in 0..NOISE_DOTS {
            let color = random_color(&mut rng, 100, 200);
            let x = rng.random_range(0..WIDTH as i32);
            let y = rng.random_range(0..HEIGHT as i32);
            draw_filled_ellipse_mut(&mut canvas, (x, y), 1, 1, color);
        }

        let char_width = WIDTH / (code.chars().count() as u32 + 1);
        let y = ((HEIGHT.saturating_sub(TILE)) / 2) as i64;
        for (i, ch) in code.chars().enumerate() {
            let tile = self.rotated_glyph(ch, &mut rng);
            let x = (char_width / 2) as i64 + (i as u32 * char_width) as i64;
            image::imageops::overlay(&mut canvas, &tile, x, y);
        }

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("Failed to encode captcha image")?;

        Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buf)))
    }

    /// Draw one character on a transparent tile and rotate it within ±15°.
    fn rotated_glyph(&self, ch: char, rng: &mut impl Rng) -> RgbaImage {
        let mut tile = RgbaImage::from_pixel(TILE, TILE, Rgba([0, 0, 0, 0]));
        let color = random_color(rng, 20, 100);
        draw_text_mut(
            &mut tile,
            color,
            4,
            1,
            PxScale::from(GLYPH_SCALE),
            &self.font,
            &ch.to_string(),
        );

        let angle = rng
            .random_range(-MAX_ROTATION_DEG..=MAX_ROTATION_DEG)
            .to_radians();
        rotate_about_center(&tile, angle, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
    }
}

fn random_color(rng: &mut impl Rng, min: u8, max: u8) -> Rgba<u8> {
    Rgba([
        rng.random_range(min..max),
        rng.random_range(min..max),
        rng.random_range(min..max),
        255,
    ])
}
