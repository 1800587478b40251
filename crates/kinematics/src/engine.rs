use serde::{Deserialize, Serialize};
use timeseries::body::angle_group_for;
use timeseries::{is_valid_sample, AngleGroup, AngleTable, MarkerSeries, MarkerTable};

use crate::calibration::{Calibration, UnitLabels};
use crate::smoothing::{gradient, FilterError, SavitzkyGolay};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicsConfig {
    /// Smoother window length in samples (odd).
    pub window: usize,
    /// Smoother polynomial degree.
    pub degree: usize,
}

impl Default for KinematicsConfig {
    fn default() -> Self { Self { window: 11, degree: 3 } }
}

/// Angle-derived series for the selected marker's angle group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleKinematics {
    pub group: AngleGroup,
    pub angle: Vec<f64>,
    pub angvel: Vec<f64>,
    pub angacc: Vec<f64>,
}

/// Kinematics of one marker under one calibration. Built in full by
/// [`KinematicsEngine::compute`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KinematicsSnapshot {
    pub marker: String,
    pub units: UnitLabels,
    pub time: Vec<f64>,
    /// Position in the calibrated unit.
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vtotal: Vec<f64>,
    pub ax: Vec<f64>,
    pub ay: Vec<f64>,
    pub atotal: Vec<f64>,
    pub angle: Option<AngleKinematics>,
}

impl KinematicsSnapshot {
    pub fn len(&self) -> usize { self.vx.len() }

    pub fn is_empty(&self) -> bool { self.vx.is_empty() }

    pub fn angle_group(&self) -> Option<AngleGroup> { self.angle.as_ref().map(|a| a.group) }
}

#[derive(Debug, Clone)]
pub struct KinematicsEngine {
    filter: SavitzkyGolay,
}

impl KinematicsEngine {
    pub fn new(config: KinematicsConfig) -> Result<Self, FilterError> {
        Ok(Self { filter: SavitzkyGolay::new(config.window, config.degree)? })
    }

    pub fn smooth(&self, values: &[f64]) -> Vec<f64> { self.filter.apply(values) }

    /// Raw gradient, then smoothed.
    pub fn differentiate(&self, values: &[f64], dt: f64) -> Vec<f64> { self.smooth(&gradient(values, dt)) }

    /// Builds the snapshot for `marker`. `None` when the marker is not in the
    /// table.
    pub fn compute(
        &self,
        markers: &MarkerTable,
        marker: &str,
        angles: Option<&AngleTable>,
        calibration: &Calibration,
    ) -> Option<KinematicsSnapshot> {
        let series = markers.marker(marker)?;
        let dt = markers.sample_interval();
        let scale = calibration.scale();
        let snapshot = self.compute_series(series, &markers.time, dt, scale, calibration.units(), angles);
        tracing::debug!(
            marker,
            scale,
            samples = snapshot.len(),
            angle = snapshot.angle_group().map(AngleGroup::as_str),
            "kinematics recomputed"
        );
        Some(snapshot)
    }

    fn compute_series(
        &self,
        series: &MarkerSeries,
        time: &[f64],
        dt: f64,
        scale: f64,
        units: UnitLabels,
        angles: Option<&AngleTable>,
    ) -> KinematicsSnapshot {
        // undetected frames become gaps in both axes
        let detected: Vec<bool> = series.x.iter().zip(&series.y).map(|(x, y)| is_valid_sample(*x, *y)).collect();
        let x = masked(&series.x, &detected, scale);
        let y = masked(&series.y, &detected, scale);

        let vx_raw = gradient(&x, dt);
        let vy_raw = gradient(&y, dt);
        let vx = self.smooth(&vx_raw);
        let vy = self.smooth(&vy_raw);
        let vtotal = non_negative(self.smooth(&magnitude(&vx_raw, &vy_raw)));

        let ax_raw = gradient(&vx, dt);
        let ay_raw = gradient(&vy, dt);
        let ax = self.smooth(&ax_raw);
        let ay = self.smooth(&ay_raw);
        let atotal = non_negative(self.smooth(&magnitude(&ax_raw, &ay_raw)));

        let angle = angle_group_for(&series.name).and_then(|group| {
            let raw = angles?.angle(group.as_str())?;
            let n = time.len().min(raw.len());
            let angle = raw.angle[..n].to_vec();
            let angvel = self.differentiate(&angle, dt);
            let angacc = self.differentiate(&angvel, dt);
            Some(AngleKinematics { group, angle, angvel, angacc })
        });

        KinematicsSnapshot {
            marker: series.name.clone(),
            units,
            time: time.to_vec(),
            x,
            y,
            vx,
            vy,
            vtotal,
            ax,
            ay,
            atotal,
            angle,
        }
    }
}

fn magnitude(a: &[f64], b: &[f64]) -> Vec<f64> { a.iter().zip(b).map(|(x, y)| x.hypot(*y)).collect() }

fn masked(values: &[f64], detected: &[bool], scale: f64) -> Vec<f64> {
    values.iter().zip(detected).map(|(v, ok)| if *ok { v * scale } else { f64::NAN }).collect()
}

/// Smoothing can undershoot a magnitude near sharp changes. NaN stays NaN.
fn non_negative(mut values: Vec<f64>) -> Vec<f64> {
    for v in values.iter_mut().filter(|v| **v < 0.0) {
        *v = 0.0;
    }
    values
}
