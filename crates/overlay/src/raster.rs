//! Rasterises a [`DisplayList`] onto an RGBA frame with imageproc.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};

use crate::scene::{DisplayList, Primitive};
use crate::style::OverlayStyle;
use crate::OverlayError;

const BACKGROUND: Rgba<u8> = Rgba([30, 30, 46, 255]);

pub struct Painter {
    font: Option<FontArc>,
    scale: PxScale,
}

impl Painter {
    /// Loads the style's label font if one is set.
    pub fn new(style: &OverlayStyle) -> Result<Self, OverlayError> {
        let font = match &style.font {
            Some(path) => Some(load_font(path)?),
            None => None,
        };
        Ok(Self { font, scale: PxScale::from(style.label_scale) })
    }

    pub fn has_font(&self) -> bool { self.font.is_some() }

    pub fn paint(&self, list: &DisplayList, img: &mut RgbaImage) {
        let mut skipped = 0usize;
        for p in &list.primitives {
            match p {
                Primitive::Line { from, to, color, width } => {
                    thick_line(img, (from.x as f32, from.y as f32), (to.x as f32, to.y as f32), Rgba(*color), *width)
                }
                Primitive::Dot { center, radius, color } => {
                    draw_filled_circle_mut(img, (center.x as i32, center.y as i32), *radius, Rgba(*color))
                }
                Primitive::Label { anchor, text, color } => match &self.font {
                    Some(font) => {
                        let top = anchor.y - f64::from(self.scale.y);
                        draw_text_mut(img, Rgba(*color), anchor.x as i32, top as i32, self.scale, font, text)
                    }
                    None => skipped += 1,
                },
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, "labels not drawn, no font configured");
        }
    }
}

/// Dark canvas used when no video frame is available.
pub fn blank_canvas(width: u32, height: u32) -> RgbaImage { RgbaImage::from_pixel(width, height, BACKGROUND) }

/// Decodes a still frame to draw over.
pub fn load_background(path: &Path) -> Result<RgbaImage, OverlayError> { Ok(image::open(path)?.to_rgba8()) }

pub fn save_png(img: &RgbaImage, path: &Path) -> Result<(), OverlayError> {
    img.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

fn load_font(path: &Path) -> Result<FontArc, OverlayError> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes).map_err(|_| OverlayError::InvalidFont(path.to_path_buf()))
}

/// Offset copies of a one-pixel line, spread perpendicular to its main axis.
fn thick_line(img: &mut RgbaImage, from: (f32, f32), to: (f32, f32), color: Rgba<u8>, width: u32) {
    let horizontal = (to.0 - from.0).abs() >= (to.1 - from.1).abs();
    let half = (width.max(1) as i32 - 1) / 2;
    let spread = width.max(1) as i32 - 1 - half;
    for o in -half..=spread {
        let o = o as f32;
        if horizontal {
            draw_line_segment_mut(img, (from.0, from.1 + o), (to.0, to.1 + o), color);
        } else {
            draw_line_segment_mut(img, (from.0 + o, from.1), (to.0 + o, to.1), color);
        }
    }
}
