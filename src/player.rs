//! Macro playback
//!
//! Reconstructs the original gaps by differencing absolute offsets. Events
//! are replayed literally: unbalanced down/up pairs are not repaired.

use crate::cancel::{sleep_or_cancel, CancelToken};
use crate::capture::{InputBackend, Macro};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled,
}

pub struct MacroPlayer {
    backend: Arc<dyn InputBackend>,
}

impl MacroPlayer {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self { backend }
    }

    /// Replay `recording` against the backend.
    ///
    /// Cancellation is observed during the waits between events; an event
    /// whose wait was interrupted is not synthesized.
    pub async fn play(&self, recording: &Macro, cancel: &CancelToken) -> PlaybackOutcome {
        let mut last_offset = 0u64;

        for (index, event) in recording.events().iter().enumerate() {
            let wait = event.offset_ms.saturating_sub(last_offset);
            if wait > 0 && !sleep_or_cancel(Duration::from_millis(wait), cancel).await {
                tracing::info!(
                    "Playback cancelled before event {} of {}",
                    index + 1,
                    recording.len()
                );
                return PlaybackOutcome::Cancelled;
            }

            self.backend.move_cursor(event.x, event.y);
            self.backend.synthesize(event.button, event.is_down);
            tracing::trace!("replayed {}", event);

            last_offset = event.offset_ms;
        }

        tracing::info!("Playback completed ({} events)", recording.len());
        PlaybackOutcome::Completed
    }
}
