use serde::{Deserialize, Serialize};
use std::fmt;

/// The single activity the engine is engaged in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Idle,
    Clicking,
    Recording,
    Playing,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "idle"),
            Mode::Clicking => write!(f, "clicking"),
            Mode::Recording => write!(f, "recording"),
            Mode::Playing => write!(f, "playing"),
        }
    }
}

/// Logical request coming from a UI button or a global hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    ToggleClick,
    ToggleRecord,
    #[serde(rename = "toggleStop", alias = "stop")]
    Stop,
    TogglePlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Ui,
    Hotkey,
}

/// What a trigger did to the mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new session started in this mode
    Started(Mode),
    /// The active session was asked to stop; the mode returns to idle once it has
    Stopping(Mode),
    /// The trigger does not apply to the current mode
    Ignored(Mode),
}

impl TriggerOutcome {
    pub fn mode(&self) -> Mode {
        match self {
            TriggerOutcome::Started(mode)
            | TriggerOutcome::Stopping(mode)
            | TriggerOutcome::Ignored(mode) => *mode,
        }
    }
}
