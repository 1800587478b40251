use std::path::{Path, PathBuf};

use crate::{AngleTable, MarkerTable};

const RESULT_SUFFIX: &str = "_Sports2D";
const PERSON: &str = "person00";

/// Where the analysis tool writes its results for a given video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPaths {
    pub dir: PathBuf,
    pub trc: PathBuf,
    pub mot: PathBuf,
}

impl AnalysisPaths {
    /// `D/base.ext` → `D/base_Sports2D/base_Sports2D_{px,angles}_person00.{trc,mot}`
    pub fn for_video(video: &Path) -> Self {
        let base = video.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let parent = video.parent().unwrap_or_else(|| Path::new(""));
        let stem = format!("{base}{RESULT_SUFFIX}");
        let dir = parent.join(&stem);
        Self {
            trc: dir.join(format!("{stem}_px_{PERSON}.trc")),
            mot: dir.join(format!("{stem}_angles_{PERSON}.mot")),
            dir,
        }
    }

    pub fn exists(&self) -> bool { self.dir.is_dir() }
}

/// Series loaded for one video. Either table may be absent.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResults {
    pub markers: Option<MarkerTable>,
    pub angles: Option<AngleTable>,
}

impl AnalysisResults {
    /// Loads whatever results exist next to `video`. `None` means no analysis
    /// has been run; an unreadable file leaves only that table absent.
    pub fn discover(video: &Path) -> Option<Self> {
        let paths = AnalysisPaths::for_video(video);
        if !paths.exists() {
            tracing::info!(dir = %paths.dir.display(), "no analysis folder found");
            return None;
        }
        let markers = load_optional(&paths.trc, MarkerTable::load);
        let angles = load_optional(&paths.mot, AngleTable::load);
        tracing::info!(dir = %paths.dir.display(), markers = markers.is_some(), angles = angles.is_some(), "loaded analysis");
        Some(Self { markers, angles })
    }

    pub fn is_empty(&self) -> bool { self.markers.is_none() && self.angles.is_none() }
}

fn load_optional<T>(path: &Path, load: fn(&Path) -> Result<T, crate::ParseError>) -> Option<T> {
    if !path.exists() { return None; }
    match load(path) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "discarding unreadable analysis file");
            None
        }
    }
}
