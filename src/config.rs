//! Engine configuration
//!
//! All sections default so a partial JSON file only overrides what it names.

use crate::capture::MouseButton;
use crate::controller::Trigger;
use crate::error::ConfigError;
use crate::hotkeys::HotkeyBinding;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Fixed delays used by the click loop and the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    /// How long a button stays pressed in hold mode
    pub hold_dwell_ms: u64,
    /// Pause after every click so the backend is not saturated
    pub settle_ms: u64,
    /// Delay between the record trigger and the first captured event
    pub record_pre_roll_ms: u64,
    /// Window after a click session starts during which UI toggles are ignored
    pub click_start_guard_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            hold_dwell_ms: 50,
            settle_ms: 10,
            record_pre_roll_ms: 1500,
            click_start_guard_ms: 2000,
        }
    }
}

impl Timings {
    pub fn hold_dwell(&self) -> Duration {
        Duration::from_millis(self.hold_dwell_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn record_pre_roll(&self) -> Duration {
        Duration::from_millis(self.record_pre_roll_ms)
    }

    pub fn click_start_guard(&self) -> Duration {
        Duration::from_millis(self.click_start_guard_ms)
    }
}

/// Click settings as entered by the user, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickSettings {
    pub interval: String,
    pub button: Option<MouseButton>,
    pub hold_down: bool,
}

impl ClickSettings {
    pub fn new(interval_ms: u64, button: MouseButton, hold_down: bool) -> Self {
        Self {
            interval: interval_ms.to_string(),
            button: Some(button),
            hold_down,
        }
    }

    pub fn validate(&self) -> Result<ClickConfig, ConfigError> {
        let interval_ms = match self.interval.trim().parse::<i64>() {
            Ok(ms) if ms >= 1 => ms as u64,
            _ => return Err(ConfigError::InvalidInterval(self.interval.clone())),
        };
        let button = self.button.ok_or(ConfigError::NoButton)?;

        Ok(ClickConfig {
            interval_ms,
            button,
            hold_down: self.hold_down,
        })
    }
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self::new(100, MouseButton::Left, false)
    }
}

/// Validated settings for one click session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickConfig {
    pub interval_ms: u64,
    pub button: MouseButton,
    pub hold_down: bool,
}

impl ClickConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.interval_ms < 1 {
            return Err(ConfigError::InvalidInterval(self.interval_ms.to_string()));
        }
        Ok(())
    }
}

/// A global shortcut and the trigger it fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyConfig {
    pub trigger: Trigger,
    pub binding: HotkeyBinding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub timings: Timings,
    pub click: ClickSettings,
    pub hotkeys: Vec<HotkeyConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timings: Timings::default(),
            click: ClickSettings::default(),
            hotkeys: HotkeyBinding::defaults()
                .into_iter()
                .map(|(trigger, binding)| HotkeyConfig { trigger, binding })
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }
}
