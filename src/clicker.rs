//! Repeating click loop
//!
//! One click happens immediately, then one per interval until cancelled. A
//! click cycle that has started always finishes, hold dwell and settle
//! delay included; cancellation is observed between cycles.

use crate::cancel::{sleep_or_cancel, CancelToken};
use crate::capture::InputBackend;
use crate::config::{ClickConfig, Timings};
use crate::error::ConfigError;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub struct ClickScheduler {
    backend: Arc<dyn InputBackend>,
    timings: Timings,
    runtime: Handle,
}

/// A running click loop
pub struct ClickHandle {
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl ClickHandle {
    /// Ask the loop to stop after the cycle in flight. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl ClickScheduler {
    pub fn new(backend: Arc<dyn InputBackend>, timings: Timings, runtime: Handle) -> Self {
        Self {
            backend,
            timings,
            runtime,
        }
    }

    /// Start clicking with `config`.
    ///
    /// `on_stopped` runs exactly once, after the loop has exited.
    pub fn start<F>(&self, config: &ClickConfig, on_stopped: F) -> Result<ClickHandle, ConfigError>
    where
        F: FnOnce() + Send + 'static,
    {
        config.check()?;

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let backend = Arc::clone(&self.backend);
        let timings = self.timings;
        let config = *config;

        tracing::info!(
            "Click loop starting (button={}, interval={}ms, hold={})",
            config.button,
            config.interval_ms,
            config.hold_down
        );

        let task = self.runtime.spawn(async move {
            let mut clicks: u64 = 0;
            loop {
                click_once(backend.as_ref(), &config, &timings).await;
                clicks += 1;

                if !sleep_or_cancel(config.interval(), &token).await {
                    break;
                }
            }
            tracing::info!("Click loop stopped after {} clicks", clicks);
            on_stopped();
        });

        Ok(ClickHandle { cancel, task })
    }
}

async fn click_once(backend: &dyn InputBackend, config: &ClickConfig, timings: &Timings) {
    backend.synthesize(config.button, true);
    if config.hold_down {
        tokio::time::sleep(timings.hold_dwell()).await;
    }
    backend.synthesize(config.button, false);
    tokio::time::sleep(timings.settle()).await;
}
