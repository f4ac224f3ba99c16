//! Input backend capability
//!
//! The engine never talks to the OS input subsystem directly. Whatever
//! injects mouse events and hooks global input implements this trait.

use crate::capture::types::{MouseButton, PointerSample};
use crate::error::EngineResult;

/// Callback invoked by the backend for a global button notification.
///
/// May run on an arbitrary notifier thread and must not block.
pub type InputCallback = Box<dyn Fn(PointerSample) + Send + Sync>;

/// Identifies a live global input subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

pub trait InputBackend: Send + Sync {
    /// Press (`is_down = true`) or release a mouse button at the current cursor position
    fn synthesize(&self, button: MouseButton, is_down: bool);

    /// Move the cursor to absolute screen coordinates
    fn move_cursor(&self, x: i32, y: i32);

    /// Start delivering global button-down and button-up notifications
    fn subscribe_global_input(
        &self,
        on_down: InputCallback,
        on_up: InputCallback,
    ) -> EngineResult<SubscriptionHandle>;

    /// Stop a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}
