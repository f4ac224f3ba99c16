//! Status reporting
//!
//! Upward notifications for whatever presents the engine to the user.
//! Presentation only: nothing sent here feeds back into control flow.

use crate::controller::Mode;
use parking_lot::Mutex as ParkingMutex;

pub trait StatusSink: Send + Sync {
    /// Human-readable status line
    fn status(&self, text: &str);

    /// A recorded event was appended to the macro
    fn event_appended(&self, _line: &str) {}

    /// The whole event list changed (recording started, macro loaded)
    fn events_replaced(&self, _lines: &[String]) {}

    /// The mode changed. Changes raced by a newer one are skipped, so the
    /// last mode delivered is the current one. Implementations may read the
    /// controller from here but must not trigger transitions.
    fn mode_changed(&self, _mode: Mode) {}

    /// Whether there is a macro that can be played
    fn playback_available(&self, _available: bool) {}
}

/// Forwards status updates to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn status(&self, text: &str) {
        tracing::info!(target: "autoclicker::status", "{}", text);
    }

    fn event_appended(&self, line: &str) {
        tracing::info!(target: "autoclicker::status", "  {}", line);
    }

    fn events_replaced(&self, lines: &[String]) {
        tracing::debug!(target: "autoclicker::status", "event list now has {} entries", lines.len());
    }

    fn mode_changed(&self, mode: Mode) {
        tracing::debug!(target: "autoclicker::status", "mode: {}", mode);
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    statuses: ParkingMutex<Vec<String>>,
    events: ParkingMutex<Vec<String>>,
    modes: ParkingMutex<Vec<Mode>>,
    playback_available: ParkingMutex<Option<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().last().cloned()
    }

    pub fn has_status(&self, text: &str) -> bool {
        self.statuses.lock().iter().any(|s| s == text)
    }

    /// Current contents of the displayed event list
    pub fn event_lines(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn modes(&self) -> Vec<Mode> {
        self.modes.lock().clone()
    }

    pub fn playback_available(&self) -> Option<bool> {
        *self.playback_available.lock()
    }
}

impl StatusSink for MemorySink {
    fn status(&self, text: &str) {
        self.statuses.lock().push(text.to_string());
    }

    fn event_appended(&self, line: &str) {
        self.events.lock().push(line.to_string());
    }

    fn events_replaced(&self, lines: &[String]) {
        *self.events.lock() = lines.to_vec();
    }

    fn mode_changed(&self, mode: Mode) {
        self.modes.lock().push(mode);
    }

    fn playback_available(&self, available: bool) {
        *self.playback_available.lock() = Some(available);
    }
}
