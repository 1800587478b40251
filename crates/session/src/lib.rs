//! Viewer state for one analysed video: selection, calibration, playback and
//! the kinematics snapshot of the selected marker.

pub mod playback;
pub mod selection;
mod session;

pub use playback::{PlayState, PlaybackClock, PlaybackError, FALLBACK_FPS};
pub use selection::{Hit, SelectionConfig, SelectionIndex, SELECTION_RADIUS};
pub use session::{Session, SessionConfig};
