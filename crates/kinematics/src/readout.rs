//! Indexed reads of a snapshot for the stats panel and plot widgets.

use serde::Serialize;
use timeseries::is_valid_sample;

use crate::engine::KinematicsSnapshot;

pub const NO_DATA: &str = "no data";

/// Values shown for the selected marker at one frame. `None` renders as
/// [`NO_DATA`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub position: Option<(f64, f64)>,
    pub speed: Option<f64>,
    pub acceleration: Option<f64>,
    pub angle: Option<f64>,
    pub angular_velocity: Option<f64>,
    pub angular_acceleration: Option<f64>,
}

impl FrameStats {
    pub fn rows(&self, snapshot: &KinematicsSnapshot) -> Vec<(String, String)> {
        let u = &snapshot.units;
        vec![
            (format!("Position ({})", u.position), fmt_pair(self.position)),
            (format!("Linear Velocity ({})", u.velocity), fmt(self.speed, 4)),
            (format!("Linear Acceleration ({})", u.acceleration), fmt(self.acceleration, 4)),
            ("Angle (deg)".to_string(), fmt(self.angle, 2)),
            ("Angular Velocity (deg/s)".to_string(), fmt(self.angular_velocity, 2)),
            ("Angular Acceleration (deg/s²)".to_string(), fmt(self.angular_acceleration, 2)),
        ]
    }
}

fn fmt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(v) => format!("{v:.decimals$}"),
        None => NO_DATA.to_string(),
    }
}

fn fmt_pair(v: Option<(f64, f64)>) -> String {
    match v {
        Some((x, y)) => format!("({x:.4}, {y:.4})"),
        None => NO_DATA.to_string(),
    }
}

fn at(series: &[f64], frame: usize) -> Option<f64> { series.get(frame).copied().filter(|v| !v.is_nan()) }

impl KinematicsSnapshot {
    /// Stats at `frame`. A frame where the marker was not detected has no
    /// values at all.
    pub fn sample(&self, frame: usize) -> FrameStats {
        let (Some(&x), Some(&y)) = (self.x.get(frame), self.y.get(frame)) else { return FrameStats::default() };
        if !is_valid_sample(x, y) {
            return FrameStats::default();
        }
        let angle = self.angle.as_ref();
        FrameStats {
            position: Some((x, y)),
            speed: at(&self.vtotal, frame),
            acceleration: at(&self.atotal, frame),
            angle: angle.and_then(|a| at(&a.angle, frame)),
            angular_velocity: angle.and_then(|a| at(&a.angvel, frame)),
            angular_acceleration: angle.and_then(|a| at(&a.angacc, frame)),
        }
    }

    pub fn plot(&self, quantity: Quantity) -> Option<PlotSeries<'_>> {
        let values: &[f64] = match quantity {
            Quantity::Vx => &self.vx,
            Quantity::Vy => &self.vy,
            Quantity::Vtotal => &self.vtotal,
            Quantity::Ax => &self.ax,
            Quantity::Ay => &self.ay,
            Quantity::Atotal => &self.atotal,
            Quantity::AngularVelocity => &self.angle.as_ref()?.angvel,
            Quantity::AngularAcceleration => &self.angle.as_ref()?.angacc,
        };
        let n = self.time.len().min(values.len());
        Some(PlotSeries { quantity, time: &self.time[..n], values: &values[..n] })
    }

    pub fn plot_title(&self, quantity: Quantity) -> String {
        match quantity {
            Quantity::AngularVelocity | Quantity::AngularAcceleration => match self.angle_group() {
                Some(group) => format!("{}: {group}", quantity.title()),
                None => format!("{} (no angle data)", quantity.title()),
            },
            Quantity::Vx | Quantity::Vy | Quantity::Vtotal => format!("Linear Velocity ({})", self.units.velocity),
            Quantity::Ax | Quantity::Ay | Quantity::Atotal => format!("Linear Acceleration ({})", self.units.acceleration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantity {
    Vx,
    Vy,
    Vtotal,
    Ax,
    Ay,
    Atotal,
    AngularVelocity,
    AngularAcceleration,
}

impl Quantity {
    pub const ALL: [Quantity; 8] = [
        Quantity::Vx,
        Quantity::Vy,
        Quantity::Vtotal,
        Quantity::Ax,
        Quantity::Ay,
        Quantity::Atotal,
        Quantity::AngularVelocity,
        Quantity::AngularAcceleration,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Quantity::Vx => "Vx",
            Quantity::Vy => "Vy",
            Quantity::Vtotal => "Vtotal",
            Quantity::Ax => "Ax",
            Quantity::Ay => "Ay",
            Quantity::Atotal => "Atotal",
            Quantity::AngularVelocity => "Angular Velocity",
            Quantity::AngularAcceleration => "Angular Acceleration",
        }
    }
}

/// Time/value pairs trimmed to their common length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotSeries<'a> {
    pub quantity: Quantity,
    pub time: &'a [f64],
    pub values: &'a [f64],
}
