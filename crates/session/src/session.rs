use std::path::{Path, PathBuf};
use std::sync::Arc;

use kinematics::{
    Calibration, CalibrationError, DisplayPoint, DisplayTransform, FilterError, FrameStats, KinematicsConfig,
    KinematicsEngine, KinematicsSnapshot,
};
use overlay::{DisplayList, OverlayInput, OverlayRenderer, OverlayStyle, OverlayToggles};
use serde::{Deserialize, Serialize};
use timeseries::{AnalysisPaths, AnalysisResults, AngleTable, Frame, FramePoint, MarkerTable};

use crate::playback::{PlaybackClock, PlaybackError};
use crate::selection::{SelectionConfig, SelectionIndex};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub kinematics: KinematicsConfig,
    pub selection: SelectionConfig,
    pub overlay: OverlayStyle,
}

/// One loaded video with its analysis results and the viewer state built on
/// top of them.
pub struct Session {
    engine: KinematicsEngine,
    selection: SelectionConfig,
    renderer: OverlayRenderer,
    video: Option<PathBuf>,
    results: AnalysisResults,
    calibration: Calibration,
    selected: Option<String>,
    snapshot: Option<Arc<KinematicsSnapshot>>,
    clock: PlaybackClock,
    transform: DisplayTransform,
    pub toggles: OverlayToggles,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, FilterError> {
        Ok(Self {
            engine: KinematicsEngine::new(config.kinematics)?,
            selection: config.selection,
            renderer: OverlayRenderer::new(config.overlay),
            video: None,
            results: AnalysisResults::default(),
            calibration: Calibration::default(),
            selected: None,
            snapshot: None,
            clock: PlaybackClock::new(0.0, 0),
            transform: DisplayTransform::IDENTITY,
            toggles: OverlayToggles::default(),
        })
    }

    /// Opens a video and whatever analysis results sit next to it. Everything
    /// derived from the previous video is dropped. Returns a status line.
    pub fn load_video(&mut self, video: &Path, fps: f64, total_frames: usize) -> String {
        self.selected = None;
        self.snapshot = None;
        self.calibration.reset();
        self.clock = PlaybackClock::new(fps, total_frames);
        self.video = Some(video.to_path_buf());
        match AnalysisResults::discover(video) {
            Some(results) => {
                self.results = results;
                let dir = AnalysisPaths::for_video(video).dir;
                let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                format!("Loaded: {name}")
            }
            None => {
                self.results = AnalysisResults::default();
                "No analysis folder found".to_string()
            }
        }
    }

    /// Installs already-parsed series, as after a fresh load.
    pub fn load_results(&mut self, results: AnalysisResults, fps: f64, total_frames: usize) {
        self.selected = None;
        self.snapshot = None;
        self.calibration.reset();
        self.clock = PlaybackClock::new(fps, total_frames);
        self.results = results;
    }

    pub fn video(&self) -> Option<&Path> { self.video.as_deref() }
    pub fn markers(&self) -> Option<&MarkerTable> { self.results.markers.as_ref() }
    pub fn angles(&self) -> Option<&AngleTable> { self.results.angles.as_ref() }
    pub fn calibration(&self) -> &Calibration { &self.calibration }
    pub fn selected(&self) -> Option<&str> { self.selected.as_deref() }
    pub fn clock(&self) -> &PlaybackClock { &self.clock }
    pub fn clock_mut(&mut self) -> &mut PlaybackClock { &mut self.clock }
    pub fn current_frame(&self) -> Frame { self.clock.current_frame() }
    pub fn snapshot(&self) -> Option<Arc<KinematicsSnapshot>> { self.snapshot.clone() }

    /// Updates the letterbox used to map display clicks into the frame.
    pub fn set_view(&mut self, frame_w: u32, frame_h: u32, view_w: u32, view_h: u32) {
        self.transform = DisplayTransform::fit(frame_w, frame_h, view_w, view_h);
    }

    pub fn transform(&self) -> &DisplayTransform { &self.transform }

    /// Selects the marker nearest to a frame-space click at the current
    /// frame. A miss keeps the existing selection.
    pub fn select_at(&mut self, point: FramePoint) -> Option<&str> {
        let frame = self.current_frame();
        let hit = {
            let markers = self.results.markers.as_ref()?;
            SelectionIndex::new(markers, self.selection.radius).nearest(frame, point)?.marker.to_string()
        };
        self.select(&hit)
    }

    pub fn select_at_display(&mut self, point: DisplayPoint) -> Option<&str> {
        let p = self.transform.to_frame(point);
        self.select_at(p)
    }

    /// Selects a marker by name. Unknown names leave the selection unchanged.
    pub fn select(&mut self, name: &str) -> Option<&str> {
        self.results.markers.as_ref()?.marker(name)?;
        tracing::info!(marker = name, "selected");
        self.selected = Some(name.to_string());
        self.recompute();
        self.selected.as_deref()
    }

    pub fn calibrate(&mut self, start: FramePoint, end: FramePoint, real_length: f64) -> Result<f64, CalibrationError> {
        let ppu = self.calibration.calibrate(start, end, real_length)?;
        self.recompute();
        Ok(ppu)
    }

    pub fn calibrate_display(
        &mut self,
        start: DisplayPoint,
        end: DisplayPoint,
        real_length: f64,
    ) -> Result<f64, CalibrationError> {
        let (start, end) = (self.transform.to_frame(start), self.transform.to_frame(end));
        self.calibrate(start, end, real_length)
    }

    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
        self.recompute();
    }

    fn recompute(&mut self) {
        let (Some(markers), Some(name)) = (self.results.markers.as_ref(), self.selected.as_deref()) else {
            self.snapshot = None;
            return;
        };
        self.snapshot =
            self.engine.compute(markers, name, self.results.angles.as_ref(), &self.calibration).map(Arc::new);
    }

    pub fn seek(&mut self, frame: Frame) -> Result<(), PlaybackError> { self.clock.seek(frame) }

    /// Stats panel values for the selected marker at the current frame.
    pub fn stats(&self) -> Option<FrameStats> {
        self.snapshot.as_ref().map(|s| s.sample(self.current_frame()))
    }

    pub fn overlay(&self) -> Option<DisplayList> { self.overlay_at(self.current_frame()) }

    pub fn overlay_at(&self, frame: Frame) -> Option<DisplayList> {
        let markers = self.results.markers.as_ref()?;
        let input = OverlayInput {
            markers,
            selected: self.selected.as_deref(),
            kinematics: self.snapshot.as_deref(),
            calibration: self.calibration.reference_line(),
        };
        Some(self.renderer.build(&input, frame, self.toggles))
    }

    pub fn renderer(&self) -> &OverlayRenderer { &self.renderer }
}
