//! Input capture and injection
//!
//! This module defines the recorded event model, the backend capability the
//! engine drives, and an in-process backend for headless runs and tests.

pub mod backend;
pub mod simulated;
pub mod types;

pub use backend::{InputBackend, InputCallback, SubscriptionHandle};
pub use simulated::{BackendAction, BackendCall, SimulatedBackend};
pub use types::{InputEvent, Macro, MouseButton, PointerSample};
