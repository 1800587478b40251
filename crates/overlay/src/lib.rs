//! Per-frame overlay: skeleton, marker dots, trails, labels and the
//! calibration line, built as a display list and optionally rasterised.

use std::path::PathBuf;

use thiserror::Error;

pub mod raster;
pub mod scene;
pub mod style;
pub mod trail;

pub use raster::{blank_canvas, load_background, save_png, Painter};
pub use scene::{DisplayList, OverlayInput, OverlayRenderer, Primitive};
pub use style::{Color, OverlayStyle, OverlayToggles, TRAIL_LEN};
pub use trail::{absolute_trail, relative_trail, TrailSegment};

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a usable font: {}", .0.display())]
    InvalidFont(PathBuf),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
