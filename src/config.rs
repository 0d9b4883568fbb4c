//! Per-workspace settings from an optional `gradebookd.toml`.
//!
//! ```toml
//! [autosave]
//! delay_ms = 1500
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::autosave;

pub const SETTINGS_FILE_NAME: &str = "gradebookd.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub autosave: AutosaveSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveSettings {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    autosave::DEFAULT_DELAY.as_millis() as u64
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave.delay_ms)
    }
}

/// Settings for `workspace`. A missing file means defaults; an unreadable
/// or invalid one also falls back to defaults, with a warning.
pub fn load_workspace_settings(workspace: &Path) -> Settings {
    let path = workspace.join(SETTINGS_FILE_NAME);
    if !path.is_file() {
        return Settings::default();
    }
    let path_str = path.to_string_lossy();
    match std::fs::read_to_string(&path) {
        Ok(text) => match Settings::from_toml(&text) {
            Ok(settings) => {
                info!(target: "gradebookd", path = %path_str, delay_ms = settings.autosave.delay_ms, "loaded workspace settings");
                settings
            }
            Err(e) => {
                warn!(target: "gradebookd", path = %path_str, error = %e, "invalid settings file; using defaults");
                Settings::default()
            }
        },
        Err(e) => {
            warn!(target: "gradebookd", path = %path_str, error = %e, "failed to read settings file; using defaults");
            Settings::default()
        }
    }
}
