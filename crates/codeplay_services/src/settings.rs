//! Settings management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use codeplay_core::session::{DEFAULT_FONT_SIZE, DEFAULT_THEME};

use crate::error::ServiceError;
use crate::storage::AUTOSAVE_KEY;

/// Editor settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub editor: EditorSettings,
    pub timing: TimingSettings,
    pub storage: StorageSettings,
    pub share: ShareSettings,
    pub sandbox: SandboxSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub theme: String,
    pub font_size: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub render_debounce_ms: u64,
    pub autosave_debounce_ms: u64,
    pub initial_render_delay_ms: u64,
    pub status_revert_ms: u64,
    pub save_status_revert_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: String,
    pub autosave_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSettings {
    /// Page URL share links are built on when no page URL is known.
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    pub memory_limit_bytes: usize,
    pub max_stack_bytes: usize,
    pub time_budget_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            render_debounce_ms: 500,
            autosave_debounce_ms: 500,
            initial_render_delay_ms: 100,
            status_revert_ms: 1000,
            save_status_revert_ms: 500,
        }
    }
}

impl TimingSettings {
    pub fn render_debounce(&self) -> Duration {
        Duration::from_millis(self.render_debounce_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn initial_render_delay(&self) -> Duration {
        Duration::from_millis(self.initial_render_delay_ms)
    }

    pub fn status_revert(&self) -> Duration {
        Duration::from_millis(self.status_revert_ms)
    }

    pub fn save_status_revert(&self) -> Duration {
        Duration::from_millis(self.save_status_revert_ms)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "codeplay-storage.json".to_string(),
            autosave_key: AUTOSAVE_KEY.to_string(),
        }
    }
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/".to_string(),
        }
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 16 * 1024 * 1024,
            max_stack_bytes: 512 * 1024,
            time_budget_ms: 1000,
        }
    }
}

impl SandboxSettings {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}

impl Settings {
    /// Reads settings from a JSON file. Missing sections and fields keep
    /// their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ServiceError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&raw).map_err(|source| ServiceError::ConfigFormat {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// `load` when a path is given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ServiceError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
