//! Calibration and derivative pipeline for marker trajectories.

pub mod calibration;
pub mod engine;
pub mod readout;
pub mod smoothing;

pub use calibration::{Calibration, CalibrationError, DisplayPoint, DisplayTransform, ReferenceLine, UnitLabels};
pub use engine::{AngleKinematics, KinematicsConfig, KinematicsEngine, KinematicsSnapshot};
pub use readout::{FrameStats, PlotSeries, Quantity, NO_DATA};
pub use smoothing::{gradient, FilterError, SavitzkyGolay};
