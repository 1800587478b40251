use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use timeseries::SKELETON_BONES;

pub type Color = [u8; 4];

pub const TRAIL_LEN: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub bone: Color,
    pub dot: Color,
    pub selected: Color,
    pub angle_text: Color,
    pub relative_trail: Color,
    pub calibration: Color,
    pub dot_radius: i32,
    pub selected_radius: i32,
    pub line_width: u32,
    pub label_scale: f32,
    /// Frames of history drawn behind the selected marker.
    pub trail_len: usize,
    /// TrueType font used for labels; without it labels stay in the display list.
    pub font: Option<PathBuf>,
    /// Bone list as marker-name pairs.
    pub bones: Vec<(String, String)>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            bone: [180, 180, 180, 255],
            dot: [255, 255, 255, 255],
            selected: [80, 255, 80, 255],
            angle_text: [255, 200, 80, 255],
            relative_trail: [255, 200, 80, 255],
            calibration: [249, 226, 175, 255],
            dot_radius: 4,
            selected_radius: 9,
            line_width: 2,
            label_scale: 18.0,
            trail_len: TRAIL_LEN,
            font: None,
            bones: default_bones(),
        }
    }
}

pub fn default_bones() -> Vec<(String, String)> {
    SKELETON_BONES.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
}

impl OverlayStyle {
    /// Absolute trail colour: the blue channel grows with recency.
    pub fn trail_color(&self, intensity: u8) -> Color { [80, 200, intensity, 255] }
}

/// Which passes to draw. Dots and the selection label are always drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayToggles {
    pub skeleton: bool,
    pub trail: bool,
    pub relative_trail: bool,
}

impl Default for OverlayToggles {
    fn default() -> Self { Self { skeleton: true, trail: false, relative_trail: false } }
}
