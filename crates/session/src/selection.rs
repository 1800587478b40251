use serde::{Deserialize, Serialize};
use timeseries::{Frame, FramePoint, MarkerTable};

/// Click tolerance in frame pixels.
pub const SELECTION_RADIUS: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub radius: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self { Self { radius: SELECTION_RADIUS } }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit<'a> {
    pub marker: &'a str,
    pub distance: f64,
}

/// Nearest-marker hit testing over one table.
#[derive(Debug, Clone, Copy)]
pub struct SelectionIndex<'a> {
    markers: &'a MarkerTable,
    radius: f64,
}

impl<'a> SelectionIndex<'a> {
    pub fn new(markers: &'a MarkerTable, radius: f64) -> Self { Self { markers, radius } }

    /// The detected marker closest to `point` at `frame`, if strictly within
    /// the radius. Equal distances resolve to the earlier marker in file order.
    pub fn nearest(&self, frame: Frame, point: FramePoint) -> Option<Hit<'a>> {
        let mut best: Option<Hit<'a>> = None;
        let mut best_d = self.radius;
        for series in self.markers.iter() {
            let Some(p) = series.position(frame) else { continue };
            let d = p.distance(point);
            if d < best_d {
                best_d = d;
                best = Some(Hit { marker: series.name.as_str(), distance: d });
            }
        }
        best
    }
}
