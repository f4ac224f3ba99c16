//! Autoclicker - repeating clicks and mouse macro recording, made simple.
//!
//! This is the library crate for the timing and playback engine. It
//! arbitrates between clicking, recording and playing, and drives an
//! [`capture::InputBackend`] supplied by the host application.

pub mod cancel;
pub mod capture;
pub mod clicker;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod hotkeys;
pub mod player;
pub mod recorder;
pub mod status;
pub mod storage;

pub use capture::{InputBackend, InputEvent, Macro, MouseButton};
pub use config::{ClickConfig, ClickSettings, EngineConfig, Timings};
pub use controller::{Mode, ModeController, Trigger, TriggerOutcome, TriggerSource};
pub use error::{EngineError, EngineResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoclicker=debug,autoclicker_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
