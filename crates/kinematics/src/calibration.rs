//! Display/frame coordinate spaces and the pixel-to-metre calibration.
//!
//! Clicks arrive in display space: the frame scaled to fit the view and
//! centred with letterbox offsets. Every series lives in frame space. The two
//! are separate types and only [`DisplayTransform`] converts between them.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timeseries::FramePoint;

pub const MIN_LINE_PX: f64 = 5.0;
pub const PIXEL_UNIT: &str = "px";
pub const METRE_UNIT: &str = "m";
const FALLBACK_VIEW: (u32, u32) = (750, 480);

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("reference line is {pixels:.1} px, shorter than {} px", MIN_LINE_PX)]
    LineTooShort { pixels: f64 },
    #[error("real length must be a positive number, got {0}")]
    InvalidLength(f64),
}

/// A point in the coordinate system of the view widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTransform {
    pub scale_factor: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for DisplayTransform {
    fn default() -> Self { Self::IDENTITY }
}

impl DisplayTransform {
    pub const IDENTITY: Self = Self { scale_factor: 1.0, offset_x: 0.0, offset_y: 0.0 };

    /// Aspect-preserving fit of a `frame_w`×`frame_h` frame into a
    /// `view_w`×`view_h` view, centred with whole-pixel letterbox bars.
    pub fn fit(frame_w: u32, frame_h: u32, view_w: u32, view_h: u32) -> Self {
        if frame_w == 0 || frame_h == 0 {
            return Self::IDENTITY;
        }
        let (lw, lh) = if view_w == 0 || view_h == 0 { FALLBACK_VIEW } else { (view_w, view_h) };
        let image_aspect = frame_w as f64 / frame_h as f64;
        let view_aspect = lw as f64 / lh as f64;
        let (sw, sh) = if image_aspect > view_aspect {
            (lw, (lw as f64 / image_aspect) as u32)
        } else {
            ((lh as f64 * image_aspect) as u32, lh)
        };
        Self {
            scale_factor: sw as f64 / frame_w as f64,
            offset_x: ((lw - sw) / 2) as f64,
            offset_y: ((lh - sh) / 2) as f64,
        }
    }

    pub fn to_frame(&self, p: DisplayPoint) -> FramePoint {
        FramePoint::new((p.x - self.offset_x) / self.scale_factor, (p.y - self.offset_y) / self.scale_factor)
    }

    pub fn to_display(&self, p: FramePoint) -> DisplayPoint {
        DisplayPoint::new(p.x * self.scale_factor + self.offset_x, p.y * self.scale_factor + self.offset_y)
    }
}

/// The accepted reference measurement, in frame space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub start: FramePoint,
    pub end: FramePoint,
    pub real_length: f64,
}

impl ReferenceLine {
    pub fn pixel_length(&self) -> f64 { self.start.distance(self.end) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitLabels {
    pub position: String,
    pub velocity: String,
    pub acceleration: String,
}

impl UnitLabels {
    pub fn for_unit(unit: &str) -> Self {
        Self { position: unit.to_string(), velocity: format!("{unit}/s"), acceleration: format!("{unit}/s²") }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    line: Option<ReferenceLine>,
}

impl Calibration {
    /// Pixel length of a candidate line; rejects lines under [`MIN_LINE_PX`].
    pub fn measure(start: FramePoint, end: FramePoint) -> Result<f64, CalibrationError> {
        let pixels = start.distance(end);
        if pixels < MIN_LINE_PX {
            return Err(CalibrationError::LineTooShort { pixels });
        }
        Ok(pixels)
    }

    /// Calibrates from a line drawn on the view. Returns the new
    /// pixels-per-metre factor; on error the previous state is kept.
    pub fn calibrate_display(
        &mut self,
        start: DisplayPoint,
        end: DisplayPoint,
        transform: &DisplayTransform,
        real_length: f64,
    ) -> Result<f64, CalibrationError> {
        self.calibrate(transform.to_frame(start), transform.to_frame(end), real_length)
    }

    pub fn calibrate(&mut self, start: FramePoint, end: FramePoint, real_length: f64) -> Result<f64, CalibrationError> {
        let pixels = Self::measure(start, end)?;
        if !(real_length.is_finite() && real_length > 0.0) {
            return Err(CalibrationError::InvalidLength(real_length));
        }
        self.line = Some(ReferenceLine { start, end, real_length });
        let ppu = pixels / real_length;
        tracing::info!(pixels, real_length, pixels_per_unit = ppu, "calibrated");
        Ok(ppu)
    }

    pub fn reset(&mut self) { self.line = None; }

    pub fn is_calibrated(&self) -> bool { self.line.is_some() }

    pub fn reference_line(&self) -> Option<&ReferenceLine> { self.line.as_ref() }

    pub fn pixels_per_unit(&self) -> Option<f64> { self.line.map(|l| l.pixel_length() / l.real_length) }

    pub fn unit_name(&self) -> &'static str { if self.is_calibrated() { METRE_UNIT } else { PIXEL_UNIT } }

    pub fn units(&self) -> UnitLabels { UnitLabels::for_unit(self.unit_name()) }

    /// Multiplier from pixels to the current unit.
    pub fn scale(&self) -> f64 { self.pixels_per_unit().map_or(1.0, |ppu| 1.0 / ppu) }

    pub fn scale_to_unit(&self, pixels: f64) -> f64 {
        match self.pixels_per_unit() {
            Some(ppu) => pixels / ppu,
            None => pixels,
        }
    }

    pub fn status_text(&self) -> String {
        match self.pixels_per_unit() {
            Some(ppu) => format!("Calibrated: 1 {} = {ppu:.1} px", self.unit_name()),
            None => format!("Units: {} (uncalibrated)", self.unit_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_reference_line_of_one_hundred_pixels() {
        let mut cal = Calibration::default();
        let ppu = cal.calibrate(FramePoint::new(0.0, 0.0), FramePoint::new(100.0, 0.0), 2.0).unwrap();
        assert_eq!(ppu, 50.0);
        assert_eq!(cal.pixels_per_unit(), Some(50.0));
        assert_eq!(cal.scale_to_unit(100.0), 2.0);
        assert_eq!(cal.unit_name(), "m");
        assert_eq!(cal.status_text(), "Calibrated: 1 m = 50.0 px");
    }

    #[test]
    fn round_trip_reproduces_real_length() {
        let (a, b, len) = (FramePoint::new(12.5, 40.0), FramePoint::new(310.25, 222.0), 1.83);
        let mut cal = Calibration::default();
        cal.calibrate(a, b, len).unwrap();
        assert!((cal.scale_to_unit(a.distance(b)) - len).abs() < 1e-12);
    }

    #[test]
    fn uncalibrated_is_identity_in_pixels() {
        let cal = Calibration::default();
        assert_eq!(cal.scale_to_unit(123.0), 123.0);
        assert_eq!(cal.scale(), 1.0);
        assert_eq!(cal.units().velocity, "px/s");
        assert_eq!(cal.status_text(), "Units: px (uncalibrated)");
    }

    #[test]
    fn short_line_keeps_previous_state() {
        let mut cal = Calibration::default();
        cal.calibrate(FramePoint::new(0.0, 0.0), FramePoint::new(0.0, 80.0), 0.8).unwrap();
        let before = cal.clone();
        let err = cal.calibrate(FramePoint::new(1.0, 1.0), FramePoint::new(4.0, 4.0), 1.0).unwrap_err();
        assert!(matches!(err, CalibrationError::LineTooShort { .. }));
        assert_eq!(cal, before);
        assert_eq!(cal.calibrate(FramePoint::new(0.0, 0.0), FramePoint::new(0.0, 80.0), 0.0), Err(CalibrationError::InvalidLength(0.0)));
        assert_eq!(cal, before);
    }

    #[test]
    fn display_line_is_mapped_back_to_frame_pixels() {
        // 1920x1080 frame in a 960x720 view: scale 0.5, bars of 150 px top and bottom
        let t = DisplayTransform::fit(1920, 1080, 960, 720);
        assert_eq!(t, DisplayTransform { scale_factor: 0.5, offset_x: 0.0, offset_y: 150.0 });
        let mut cal = Calibration::default();
        let ppu = cal
            .calibrate_display(DisplayPoint::new(100.0, 200.0), DisplayPoint::new(150.0, 200.0), &t, 1.0)
            .unwrap();
        assert_eq!(ppu, 100.0);
        assert_eq!(cal.reference_line().unwrap().start, FramePoint::new(200.0, 100.0));
    }

    #[test]
    fn fit_pillarboxes_tall_frames_and_falls_back_on_empty_view() {
        let t = DisplayTransform::fit(1080, 1920, 750, 480);
        assert_eq!(t.scale_factor, 270.0 / 1080.0);
        assert_eq!(t.offset_x, 240.0);
        assert_eq!(t.offset_y, 0.0);
        assert_eq!(DisplayTransform::fit(1080, 1920, 0, 0), t);
        let p = FramePoint::new(540.0, 960.0);
        assert_eq!(t.to_frame(t.to_display(p)), p);
    }
}
