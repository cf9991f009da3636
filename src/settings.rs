use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.json";

const SCHEMA_VERSION: u32 = 1;

/// A launchable target: a pinned entry or a static shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchItem {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LaunchItem {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            icon: None,
            args: Vec::new(),
        }
    }
}

/// Timing of the two-button chord that opens the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// Maximum spread between the two button presses to count as one chord.
    #[serde(default = "default_simultaneous_threshold_ms")]
    pub simultaneous_threshold_ms: u64,
    /// Minimum pause before another chord is accepted.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            simultaneous_threshold_ms: default_simultaneous_threshold_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Items always shown in the Pinned section, in this order.
    #[serde(default)]
    pub pinned: Vec<LaunchItem>,
    /// Static entries for the Shortcuts section.
    #[serde(default)]
    pub shortcuts: Vec<LaunchItem>,
    /// Size of the Frequent section.
    #[serde(default = "default_max_frequent")]
    pub max_frequent: usize,
    /// Hard cap on persisted clipboard entries.
    #[serde(default = "default_max_clipboard_history")]
    pub max_clipboard_history: usize,
    /// Clipboard entries shown in the menu.
    #[serde(default = "default_max_clipboard_display")]
    pub max_clipboard_display: usize,
    #[serde(default)]
    pub trigger: TriggerSettings,
    /// When enabled the application initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional log file path. If `None`, logs go to stderr only.
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn default_simultaneous_threshold_ms() -> u64 {
    50
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_max_frequent() -> usize {
    5
}

fn default_max_clipboard_history() -> usize {
    10_000
}

fn default_max_clipboard_display() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            pinned: Vec::new(),
            shortcuts: Vec::new(),
            max_frequent: default_max_frequent(),
            max_clipboard_history: default_max_clipboard_history(),
            max_clipboard_display: default_max_clipboard_display(),
            trigger: TriggerSettings::default(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_json::from_str(&content)?;
        if settings.schema_version != SCHEMA_VERSION {
            tracing::warn!(
                found = settings.schema_version,
                expected = SCHEMA_VERSION,
                "settings schema version mismatch; loading leniently"
            );
        }
        Ok(settings)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::storage::write_atomic(path, &json)
    }

    /// Add `item` to the pinned list. Returns `false` when an item with the
    /// same path is already pinned.
    pub fn pin(&mut self, item: LaunchItem) -> bool {
        if self.pinned.iter().any(|p| p.path == item.path) {
            return false;
        }
        self.pinned.push(item);
        true
    }

    /// Remove the pinned item with the given path. Returns whether anything
    /// was removed.
    pub fn unpin(&mut self, path: &str) -> bool {
        let before = self.pinned.len();
        self.pinned.retain(|p| p.path != path);
        self.pinned.len() != before
    }

    /// Keys of all pinned items, used to filter the Frequent section.
    pub fn pinned_keys(&self) -> HashSet<&str> {
        self.pinned.iter().map(|p| p.path.as_str()).collect()
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.trigger.simultaneous_threshold_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.trigger.debounce_ms)
    }
}

/// Per-user data directory holding the settings and history files.
pub fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chord-launcher")
}
