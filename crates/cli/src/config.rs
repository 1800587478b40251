use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jobs::AnalysisSettings;
use kinematics::KinematicsConfig;
use overlay::OverlayStyle;
use serde::{Deserialize, Serialize};
use session::{SelectionConfig, SessionConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub kinematics: KinematicsConfig,
    pub selection: SelectionConfig,
    pub overlay: OverlayStyle,
    pub analysis: AnalysisSettings,
}

pub fn default_path() -> Option<PathBuf> { dirs::config_dir().map(|d| d.join("motionlab").join("config.json")) }

impl AppConfig {
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => match default_path().filter(|p| p.is_file()) {
                Some(path) => Self::read(&path),
                None => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig { kinematics: self.kinematics, selection: self.selection, overlay: self.overlay.clone() }
    }
}
