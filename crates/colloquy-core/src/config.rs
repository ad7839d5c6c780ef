//! Settings consumed by the rendering core.
//!
//! Loaded from a TOML file under the platform config directory; every field
//! has a default so a missing or partial file never blocks startup. The
//! core only reads these flags - the settings UI that writes them is out of
//! scope.

use crate::device::DeviceTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageGrouping {
    /// Blank gap rows between messages.
    Spacious,
    /// Messages packed without gaps.
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Auto-scroll follows streaming output. Only an explicit forced scroll
    /// bypasses this when disabled.
    pub auto_scroll_enabled: bool,
    /// Restore the persisted scroll offset on mount.
    pub restore_scroll_position: bool,
    pub message_grouping: MessageGrouping,
    pub device_tier_override: Option<DeviceTier>,
    /// Initial window size of the message feed.
    pub display_count: usize,
    /// Backward expansion increment per load-more.
    pub load_more_increment: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_scroll_enabled: true,
            restore_scroll_position: true,
            message_grouping: MessageGrouping::Spacious,
            device_tier_override: None,
            display_count: 20,
            load_more_increment: 20,
        }
    }
}

impl Settings {
    /// Platform config file path, e.g. `~/.config/colloquy/settings.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "colloquy")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// malformed. A malformed file is logged, never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(target: "core.config", path = %path.display(), "invalid settings file: {err}");
                Self::default()
            }
        }
    }
}
