//! Macro recording
//!
//! Backend notifications arrive on whatever thread the backend uses. The
//! subscription callbacks only timestamp the sample and queue it; the
//! session drains that queue, so the macro is only ever mutated by its
//! owner.

use crate::capture::{InputBackend, InputEvent, Macro, PointerSample, SubscriptionHandle};
use crate::clock::{offset_ms, Clock};
use crate::error::EngineResult;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

/// A notification as received from the backend, before it becomes an event
#[derive(Debug, Clone, Copy)]
struct Captured {
    at: Instant,
    sample: PointerSample,
    is_down: bool,
}

pub struct MacroRecorder {
    backend: Arc<dyn InputBackend>,
    clock: Arc<dyn Clock>,
}

/// State of one recording between `begin` and `end`
pub struct RecordingSession {
    id: Uuid,
    started_at: Instant,
    subscription: SubscriptionHandle,
    rx: mpsc::UnboundedReceiver<Captured>,
    recorded: Macro,
}

impl RecordingSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Events recorded so far
    pub fn recorded(&self) -> &Macro {
        &self.recorded
    }

    /// Wait for the next notification, append it and return the new event.
    ///
    /// Returns `None` only if the backend dropped the subscription.
    pub async fn next_event(&mut self) -> Option<InputEvent> {
        let captured = self.rx.recv().await?;
        Some(self.append(captured))
    }

    fn append(&mut self, captured: Captured) -> InputEvent {
        // Arrival order is trusted; a backend delivering out-of-order
        // timestamps produces out-of-order offsets.
        let event = InputEvent::new(
            offset_ms(self.started_at, captured.at),
            captured.sample,
            captured.is_down,
        );
        tracing::trace!("[{}] recorded {}", self.id, event);
        self.recorded.push(event);
        event
    }
}

impl MacroRecorder {
    pub fn new(backend: Arc<dyn InputBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Start recording now. Only one session may be active at a time.
    pub fn begin(&self) -> EngineResult<RecordingSession> {
        let (tx, rx) = mpsc::unbounded_channel();
        let started_at = self.clock.now();

        let down_tx = tx.clone();
        let down_clock = Arc::clone(&self.clock);
        let on_down = Box::new(move |sample: PointerSample| {
            let _ = down_tx.send(Captured {
                at: down_clock.now(),
                sample,
                is_down: true,
            });
        });

        let up_clock = Arc::clone(&self.clock);
        let on_up = Box::new(move |sample: PointerSample| {
            let _ = tx.send(Captured {
                at: up_clock.now(),
                sample,
                is_down: false,
            });
        });

        let subscription = self.backend.subscribe_global_input(on_down, on_up)?;
        let id = Uuid::new_v4();
        tracing::info!("[{}] Recording started ({:?})", id, subscription);

        Ok(RecordingSession {
            id,
            started_at,
            subscription,
            rx,
            recorded: Macro::new(),
        })
    }

    /// Stop recording and return everything captured, in arrival order
    pub fn end(&self, mut session: RecordingSession) -> Macro {
        self.backend.unsubscribe(session.subscription);
        session.rx.close();
        while let Ok(captured) = session.rx.try_recv() {
            session.append(captured);
        }

        tracing::info!(
            "[{}] Recording ended ({} events)",
            session.id,
            session.recorded.len()
        );
        session.recorded
    }
}
