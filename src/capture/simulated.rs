//! In-process input backend
//!
//! Logs every synthesized call with the clock time it was issued and lets the
//! caller inject global notifications. Used by the headless driver and tests.

use crate::capture::backend::{InputBackend, InputCallback, SubscriptionHandle};
use crate::capture::types::{MouseButton, PointerSample};
use crate::clock::{Clock, TokioClock};
use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex as ParkingMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendAction {
    Press(MouseButton),
    Release(MouseButton),
    MoveCursor { x: i32, y: i32 },
    Subscribe(SubscriptionHandle),
    Unsubscribe(SubscriptionHandle),
}

#[derive(Debug, Clone, Copy)]
pub struct BackendCall {
    pub at: Instant,
    pub action: BackendAction,
}

struct Subscriber {
    on_down: InputCallback,
    on_up: InputCallback,
}

pub struct SimulatedBackend {
    clock: Arc<dyn Clock>,
    calls: ParkingMutex<Vec<BackendCall>>,
    subscribers: ParkingMutex<HashMap<SubscriptionHandle, Subscriber>>,
    next_handle: AtomicU64,
    subscribed: Notify,
    fail_next_subscribe: AtomicBool,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(TokioClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            calls: ParkingMutex::new(Vec::new()),
            subscribers: ParkingMutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            subscribed: Notify::new(),
            fail_next_subscribe: AtomicBool::new(false),
        }
    }

    fn log(&self, action: BackendAction) {
        tracing::trace!("backend call: {:?}", action);
        self.calls.lock().push(BackendCall {
            at: self.clock.now(),
            action,
        });
    }

    /// Deliver a global notification to every live subscriber
    pub fn emit(&self, sample: PointerSample, is_down: bool) {
        let subscribers = self.subscribers.lock();
        for subscriber in subscribers.values() {
            if is_down {
                (subscriber.on_down)(sample);
            } else {
                (subscriber.on_up)(sample);
            }
        }
    }

    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.lock().is_empty()
    }

    /// Wait until at least one global input subscription is live
    pub async fn wait_for_subscriber(&self) {
        loop {
            let notified = self.subscribed.notified();
            if self.has_subscribers() {
                return;
            }
            notified.await;
        }
    }

    /// Make the next `subscribe_global_input` call fail
    pub fn fail_next_subscribe(&self) {
        self.fail_next_subscribe.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Times at which `button` was pressed
    pub fn presses(&self, button: MouseButton) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.action == BackendAction::Press(button))
            .map(|c| c.at)
            .collect()
    }

    /// Press, release and move calls only, in issue order
    pub fn synthesized(&self) -> Vec<BackendCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| {
                matches!(
                    c.action,
                    BackendAction::Press(_)
                        | BackendAction::Release(_)
                        | BackendAction::MoveCursor { .. }
                )
            })
            .copied()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBackend for SimulatedBackend {
    fn synthesize(&self, button: MouseButton, is_down: bool) {
        if is_down {
            self.log(BackendAction::Press(button));
        } else {
            self.log(BackendAction::Release(button));
        }
    }

    fn move_cursor(&self, x: i32, y: i32) {
        self.log(BackendAction::MoveCursor { x, y });
    }

    fn subscribe_global_input(
        &self,
        on_down: InputCallback,
        on_up: InputCallback,
    ) -> EngineResult<SubscriptionHandle> {
        if self.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Backend(
                "failed to install global mouse hook".to_string(),
            ));
        }

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .lock()
            .insert(handle, Subscriber { on_down, on_up });
        self.log(BackendAction::Subscribe(handle));
        self.subscribed.notify_waiters();
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscribers.lock().remove(&handle).is_some() {
            self.log(BackendAction::Unsubscribe(handle));
        }
    }
}
