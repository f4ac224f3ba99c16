use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "Left"),
            MouseButton::Right => write!(f, "Right"),
            MouseButton::Middle => write!(f, "Middle"),
        }
    }
}

impl std::str::FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            other => Err(format!("unknown mouse button: {other}")),
        }
    }
}

/// Cursor position and button reported by a global input notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
}

/// One recorded button transition.
///
/// `offset_ms` is measured from the start of the recording. The persisted
/// field names match the macro files written by earlier releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InputEvent {
    #[serde(rename = "DelayMs", alias = "delayMs", alias = "offsetMs", alias = "OffsetMs")]
    pub offset_ms: u64,
    #[serde(alias = "x")]
    pub x: i32,
    #[serde(alias = "y")]
    pub y: i32,
    #[serde(alias = "button")]
    pub button: MouseButton,
    #[serde(alias = "isDown")]
    pub is_down: bool,
}

impl InputEvent {
    pub fn new(offset_ms: u64, sample: PointerSample, is_down: bool) -> Self {
        Self {
            offset_ms,
            x: sample.x,
            y: sample.y,
            button: sample.button,
            is_down,
        }
    }
}

impl Default for InputEvent {
    fn default() -> Self {
        Self {
            offset_ms: 0,
            x: 0,
            y: 0,
            button: MouseButton::Left,
            is_down: true,
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at ({},{}) +{} ms",
            if self.is_down { "Down" } else { "Up" },
            self.button,
            self.x,
            self.y,
            self.offset_ms
        )
    }
}

/// Ordered sequence of recorded events, kept in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Macro {
    events: Vec<InputEvent>,
}

impl Macro {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<InputEvent>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Offset of the last event, i.e. the playback length
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map(|e| e.offset_ms).unwrap_or(0)
    }

    pub fn display_lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }
}
