//! Rendering: replays strokes onto an RGBA raster and exports it.
//!
//! Replay is deterministic. Given the same ordered stroke list and the same
//! raster size, [`Raster::render`] produces the same pixels every time,
//! regardless of what was on the raster before.
//!
//! Coverage is binary: a pixel is covered by a segment when its center lies
//! within `width / 2` of the segment, which yields round caps and joins.
//! Paint writes the opaque ink color; erase writes fully transparent.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::color::parse_hex_rgba;
use crate::consts::JPEG_QUALITY;
use crate::stroke::{Ink, Point, Stroke};

/// Pixel value written by the eraser.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Background JPEG export flattens onto.
const EXPORT_BACKGROUND: [u8; 3] = [255, 255, 255];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Raster export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Parse `png`, `jpg` or `jpeg` (case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// A fixed-size RGBA drawing surface, transparent when empty.
#[derive(Debug, Clone)]
pub struct Raster {
    image: RgbaImage,
}

impl Raster {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::from_pixel(width, height, TRANSPARENT) }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = TRANSPARENT;
        }
    }

    /// Clear, then replay `strokes` in the order given.
    pub fn render(&mut self, strokes: &[Stroke]) {
        self.clear();
        for stroke in strokes {
            self.draw_stroke(stroke);
        }
    }

    /// Composite one committed stroke over the current contents.
    pub fn draw_stroke(&mut self, stroke: &Stroke) {
        self.draw_path(stroke.points(), stroke.ink(), stroke.width());
    }

    /// Composite a polyline. A single point draws a round dot.
    pub fn draw_path(&mut self, points: &[Point], ink: &Ink, width: f64) {
        match points {
            [] => {}
            [only] => self.draw_segment(*only, *only, ink, width),
            _ => {
                for pair in points.windows(2) {
                    self.draw_segment(pair[0], pair[1], ink, width);
                }
            }
        }
    }

    /// Composite a single round-capped segment from `a` to `b`.
    ///
    /// Unparseable paint colors draw nothing.
    pub fn draw_segment(&mut self, a: Point, b: Point, ink: &Ink, width: f64) {
        let value = match ink {
            Ink::Eraser => TRANSPARENT,
            Ink::Color(c) => match parse_hex_rgba(c) {
                Some(rgba) => Rgba(rgba),
                None => return,
            },
        };
        if !(width.is_finite() && width > 0.0) {
            return;
        }
        let radius = width / 2.0;
        let Some((x0, x1)) = clip_span(a.x.min(b.x) - radius, a.x.max(b.x) + radius, self.width()) else {
            return;
        };
        let Some((y0, y1)) = clip_span(a.y.min(b.y) - radius, a.y.max(b.y) + radius, self.height()) else {
            return;
        };
        let r2 = radius * radius;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if distance_sq_to_segment(center, a, b) <= r2 {
                    self.image.put_pixel(x, y, value);
                }
            }
        }
    }

    /// Encode the raster as PNG (alpha kept) or JPEG (flattened onto white).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Encode`] if the encoder fails.
    pub fn encode(&self, format: ExportFormat) -> Result<Vec<u8>, RenderError> {
        let mut out = Cursor::new(Vec::new());
        match format {
            ExportFormat::Png => self.image.write_to(&mut out, ImageFormat::Png)?,
            ExportFormat::Jpeg => {
                let flat = flatten(&self.image, EXPORT_BACKGROUND);
                JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&flat)?;
            }
        }
        Ok(out.into_inner())
    }
}

/// Pixel index range covering `[lo, hi]`, clipped to `0..len`.
fn clip_span(lo: f64, hi: f64, len: u32) -> Option<(u32, u32)> {
    if len == 0 || !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo >= f64::from(len) {
        return None;
    }
    let max = f64::from(len - 1);
    // Values are clamped into u32 range above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let span = (lo.floor().clamp(0.0, max) as u32, hi.floor().clamp(0.0, max) as u32);
    Some(span)
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 { 0.0 } else { (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0) };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    (p.x - cx).powi(2) + (p.y - cy).powi(2)
}

fn flatten(image: &RgbaImage, background: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let blend = |fg: u8, bg: u8| {
            let (fg, bg, a) = (u16::from(fg), u16::from(bg), u16::from(a));
            let mixed = (fg * a + bg * (255 - a) + 127) / 255;
            u8::try_from(mixed).unwrap_or(u8::MAX)
        };
        Rgb([blend(r, background[0]), blend(g, background[1]), blend(b, background[2])])
    })
}
