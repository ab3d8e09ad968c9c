use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::convert::TargetFormat;

/// Looked up in the working directory at start-up.
pub const SETTINGS_FILE: &str = "data_sweeper.json";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User-tunable knobs. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rows shown in each file's preview.
    pub preview_rows: usize,
    /// Initial window size in logical pixels.
    pub window_size: [f32; 2],
    /// Format preselected for newly uploaded files.
    pub default_target: TargetFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            window_size: [1200.0, 800.0],
            default_target: TargetFormat::Csv,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Settings from `path` when it exists and parses, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file: {e:#}");
                Self::default()
            }
        }
    }
}
