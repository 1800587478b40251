//! Marker and joint-angle time series produced by the pose analysis tool.
//!
//! Two text formats are read: the `.trc` position trajectory and the `.mot`
//! angle trajectory. Both loads are all-or-nothing: a parse error yields no
//! series at all.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod body;
pub mod mot;
pub mod paths;
pub mod trc;

pub use body::{AngleGroup, Marker, SKELETON_BONES};
pub use mot::{AngleSeries, AngleTable};
pub use paths::{AnalysisPaths, AnalysisResults};
pub use trc::{MarkerSeries, MarkerTable};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing header line {0}")]
    MissingHeader(usize),
    #[error("invalid header value {value:?} on line {line}")]
    BadHeaderValue { line: usize, value: String },
    #[error("invalid number {value:?} at line {line}, column {column}")]
    BadCell { line: usize, column: usize, value: String },
    #[error("column {column} for {name:?} not present in data")]
    MissingColumn { name: String, column: usize },
}

pub type Frame = usize; // 0-based index into a series, equal to the video frame number

/// A point in the frame-pixel coordinate system of the stored series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePoint {
    pub x: f64,
    pub y: f64,
}

impl FramePoint {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn distance(self, other: FramePoint) -> f64 { (self.x - other.x).hypot(self.y - other.y) }

    pub fn midpoint(self, other: FramePoint) -> FramePoint {
        FramePoint::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A sample is a detection only if both coordinates are strictly positive;
/// NaN fails the comparison and is treated the same as a non-detection.
pub fn is_valid_sample(x: f64, y: f64) -> bool { x > 0.0 && y > 0.0 }

pub(crate) fn parse_cell(raw: &str, line: usize, column: usize) -> Result<f64, ParseError> {
    let cell = raw.trim();
    if cell.is_empty() {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| ParseError::BadCell { line, column, value: cell.to_string() })
}
