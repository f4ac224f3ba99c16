//! Mode controller
//!
//! Owns the current mode and the macro buffer. Every trigger, whichever
//! thread it arrives on, goes through the `active` lock, so at most one of
//! clicking, recording and playing is ever running. A session only returns
//! the controller to idle once its task has fully finished.

mod mode;

pub use mode::{Mode, Trigger, TriggerOutcome, TriggerSource};

use crate::cancel::{sleep_or_cancel, CancelToken};
use crate::capture::{InputBackend, Macro};
use crate::clicker::{ClickHandle, ClickScheduler};
use crate::clock::{Clock, TokioClock};
use crate::config::{ClickSettings, EngineConfig, Timings};
use crate::error::{EngineError, EngineResult};
use crate::player::{MacroPlayer, PlaybackOutcome};
use crate::recorder::MacroRecorder;
use crate::status::StatusSink;
use crate::storage::{JsonMacroStore, MacroStore};
use parking_lot::{Mutex as ParkingMutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;

enum Active {
    Idle,
    Clicking {
        session: u64,
        handle: ClickHandle,
        started_at: Instant,
    },
    Recording {
        session: u64,
        cancel: CancelToken,
    },
    Playing {
        session: u64,
        cancel: CancelToken,
    },
}

impl Active {
    fn mode(&self) -> Mode {
        match self {
            Active::Idle => Mode::Idle,
            Active::Clicking { .. } => Mode::Clicking,
            Active::Recording { .. } => Mode::Recording,
            Active::Playing { .. } => Mode::Playing,
        }
    }

    fn session(&self) -> Option<u64> {
        match self {
            Active::Idle => None,
            Active::Clicking { session, .. }
            | Active::Recording { session, .. }
            | Active::Playing { session, .. } => Some(*session),
        }
    }

    fn cancel(&self) {
        match self {
            Active::Idle => {}
            Active::Clicking { handle, .. } => handle.cancel(),
            Active::Recording { cancel, .. } | Active::Playing { cancel, .. } => cancel.cancel(),
        }
    }
}

struct Shared {
    timings: Timings,
    sink: Arc<dyn StatusSink>,
    store: Arc<dyn MacroStore>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    scheduler: ClickScheduler,
    recorder: MacroRecorder,
    player: MacroPlayer,
    active: ParkingMutex<Active>,
    buffer: RwLock<Macro>,
    click_settings: ParkingMutex<ClickSettings>,
    mode_tx: watch::Sender<Mode>,
    mode_version: AtomicU64,
    mode_notifier: ModeNotifier,
    next_session: AtomicU64,
}

/// Delivers mode changes to the sink in the order they were published.
///
/// Versions are assigned under the `active` lock. A change that reaches the
/// sink after a newer one has already been delivered is dropped, so the
/// last mode the sink saw is always the current one.
#[derive(Default)]
struct ModeNotifier {
    delivered: ParkingMutex<u64>,
}

impl ModeNotifier {
    fn deliver(&self, version: u64, mode: Mode, sink: &dyn StatusSink) {
        let mut delivered = self.delivered.lock();
        if version <= *delivered {
            tracing::debug!("Dropping stale mode notification {} ({})", version, mode);
            return;
        }
        *delivered = version;
        sink.mode_changed(mode);
    }
}

/// Cheap to clone; every clone drives the same state machine
#[derive(Clone)]
pub struct ModeController {
    shared: Arc<Shared>,
}

impl ModeController {
    /// Build a controller on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn InputBackend>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self::with_parts(
            config,
            backend,
            sink,
            Arc::new(TokioClock),
            Arc::new(JsonMacroStore),
            Handle::current(),
        )
    }

    pub fn with_parts(
        config: EngineConfig,
        backend: Arc<dyn InputBackend>,
        sink: Arc<dyn StatusSink>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn MacroStore>,
        runtime: Handle,
    ) -> Self {
        let (mode_tx, _) = watch::channel(Mode::Idle);
        let shared = Shared {
            timings: config.timings,
            scheduler: ClickScheduler::new(Arc::clone(&backend), config.timings, runtime.clone()),
            recorder: MacroRecorder::new(Arc::clone(&backend), Arc::clone(&clock)),
            player: MacroPlayer::new(backend),
            sink,
            store,
            clock,
            runtime,
            active: ParkingMutex::new(Active::Idle),
            buffer: RwLock::new(Macro::new()),
            click_settings: ParkingMutex::new(config.click),
            mode_tx,
            mode_version: AtomicU64::new(0),
            mode_notifier: ModeNotifier::default(),
            next_session: AtomicU64::new(1),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Route a trigger to the component valid for the current mode.
    ///
    /// Triggers that do not apply to the current mode are ignored and leave
    /// it unchanged. Errors are also reported as status text.
    pub fn handle(&self, trigger: Trigger, source: TriggerSource) -> EngineResult<TriggerOutcome> {
        tracing::debug!("Trigger {:?} from {:?}", trigger, source);
        let outcome = match trigger {
            Trigger::ToggleClick => self.toggle_click(source),
            Trigger::ToggleRecord => self.toggle_record(),
            Trigger::Stop => self.stop(),
            Trigger::TogglePlay => self.toggle_play(),
        }?;
        if let TriggerOutcome::Ignored(mode) = outcome {
            tracing::debug!("Ignored {:?} while {}", trigger, mode);
        }
        Ok(outcome)
    }

    pub fn mode(&self) -> Mode {
        self.shared.active.lock().mode()
    }

    pub fn subscribe_mode(&self) -> watch::Receiver<Mode> {
        self.shared.mode_tx.subscribe()
    }

    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe_mode();
        let _ = rx.wait_for(|mode| *mode == Mode::Idle).await;
    }

    pub fn click_settings(&self) -> ClickSettings {
        self.shared.click_settings.lock().clone()
    }

    /// Takes effect at the next click session start
    pub fn set_click_settings(&self, settings: ClickSettings) {
        *self.shared.click_settings.lock() = settings;
    }

    pub fn macro_snapshot(&self) -> Macro {
        self.shared.buffer.read().clone()
    }

    pub fn display_lines(&self) -> Vec<String> {
        self.shared.buffer.read().display_lines()
    }

    fn toggle_click(&self, source: TriggerSource) -> EngineResult<TriggerOutcome> {
        let shared = &self.shared;
        let mut active = shared.active.lock();

        match active.mode() {
            Mode::Idle => {
                let validated = shared.click_settings.lock().validate();
                let config = match validated {
                    Ok(config) => config,
                    Err(e) => {
                        drop(active);
                        shared.sink.status(&e.to_string());
                        return Err(e.into());
                    }
                };

                let session = shared.next_session();
                let done = Arc::clone(shared);
                let handle = shared.scheduler.start(&config, move || {
                    done.finish(session, "Auto-clicker stopped.");
                })?;

                *active = Active::Clicking {
                    session,
                    handle,
                    started_at: shared.clock.now(),
                };
                shared.publish_mode(active, Mode::Clicking);
                shared
                    .sink
                    .status(&format!("Auto-clicker running ({})", config.button));
                Ok(TriggerOutcome::Started(Mode::Clicking))
            }
            Mode::Clicking => {
                if let Active::Clicking {
                    handle, started_at, ..
                } = &*active
                {
                    let running_for = shared.clock.now().saturating_duration_since(*started_at);
                    if source == TriggerSource::Ui
                        && running_for < shared.timings.click_start_guard()
                    {
                        tracing::debug!("UI toggle inside the start guard ({:?})", running_for);
                        return Ok(TriggerOutcome::Ignored(Mode::Clicking));
                    }
                    handle.cancel();
                }
                Ok(TriggerOutcome::Stopping(Mode::Clicking))
            }
            mode => Ok(TriggerOutcome::Ignored(mode)),
        }
    }

    fn toggle_record(&self) -> EngineResult<TriggerOutcome> {
        let shared = &self.shared;
        let mut active = shared.active.lock();

        match active.mode() {
            Mode::Idle => {
                let session = shared.next_session();
                let cancel = CancelToken::new();
                *active = Active::Recording {
                    session,
                    cancel: cancel.clone(),
                };
                shared.buffer.write().clear();
                shared.publish_mode(active, Mode::Recording);

                shared.sink.events_replaced(&[]);
                shared.sink.playback_available(false);
                shared.sink.status(&format!(
                    "Recording will start in {}s. Move to the target window.",
                    shared.timings.record_pre_roll().as_secs_f64()
                ));

                shared
                    .runtime
                    .spawn(Arc::clone(shared).run_recording(session, cancel));
                Ok(TriggerOutcome::Started(Mode::Recording))
            }
            Mode::Recording => {
                active.cancel();
                Ok(TriggerOutcome::Stopping(Mode::Recording))
            }
            mode => Ok(TriggerOutcome::Ignored(mode)),
        }
    }

    fn toggle_play(&self) -> EngineResult<TriggerOutcome> {
        let shared = &self.shared;
        let mut active = shared.active.lock();

        match active.mode() {
            Mode::Idle => {
                let snapshot = shared.buffer.read().clone();
                if snapshot.is_empty() {
                    drop(active);
                    let err = EngineError::EmptyMacro;
                    shared.sink.status(&err.to_string());
                    return Err(err);
                }

                let session = shared.next_session();
                let cancel = CancelToken::new();
                *active = Active::Playing {
                    session,
                    cancel: cancel.clone(),
                };
                shared.publish_mode(active, Mode::Playing);
                shared.sink.status("Playing macro...");

                shared
                    .runtime
                    .spawn(Arc::clone(shared).run_playback(session, snapshot, cancel));
                Ok(TriggerOutcome::Started(Mode::Playing))
            }
            Mode::Playing => {
                active.cancel();
                Ok(TriggerOutcome::Stopping(Mode::Playing))
            }
            mode => Ok(TriggerOutcome::Ignored(mode)),
        }
    }

    fn stop(&self) -> EngineResult<TriggerOutcome> {
        let active = self.shared.active.lock();
        match active.mode() {
            mode @ (Mode::Recording | Mode::Playing) => {
                active.cancel();
                Ok(TriggerOutcome::Stopping(mode))
            }
            mode => Ok(TriggerOutcome::Ignored(mode)),
        }
    }

    /// Replace the macro with the contents of `path`.
    ///
    /// Rejected while recording or playing. On failure the current macro is
    /// left untouched.
    pub async fn load_macro(&self, path: &Path) -> EngineResult<usize> {
        let shared = &self.shared;
        shared.ensure_buffer_writable("load")?;

        let loaded = match shared.store.load(path).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!("Failed to load {:?}: {}", path, e);
                shared.sink.status(&format!("Failed to load: {e}"));
                return Err(e.into());
            }
        };

        // The mode may have changed while the file was being read.
        let active = shared.active.lock();
        if let mode @ (Mode::Recording | Mode::Playing) = active.mode() {
            drop(active);
            return Err(shared.reject("load", mode));
        }
        let count = loaded.len();
        let lines = loaded.display_lines();
        *shared.buffer.write() = loaded;
        drop(active);

        shared.sink.events_replaced(&lines);
        shared.sink.status(&format!(
            "Loaded {} events from {}",
            count,
            path.display()
        ));
        shared.sink.playback_available(count > 0);
        Ok(count)
    }

    /// Write the current macro to `path`. Refuses an empty macro.
    pub async fn save_macro(&self, path: &Path) -> EngineResult<usize> {
        let shared = &self.shared;
        let snapshot = {
            let active = shared.active.lock();
            if active.mode() == Mode::Recording {
                drop(active);
                return Err(shared.reject("save", Mode::Recording));
            }
            shared.buffer.read().clone()
        };

        if snapshot.is_empty() {
            shared.sink.status("No macro to save.");
            return Err(EngineError::EmptyMacro);
        }

        if let Err(e) = shared.store.save(path, &snapshot).await {
            tracing::warn!("Failed to save {:?}: {}", path, e);
            shared.sink.status(&format!("Failed to save: {e}"));
            return Err(e.into());
        }

        shared
            .sink
            .status(&format!("Saved macro to {}", path.display()));
        Ok(snapshot.len())
    }

    /// Cancel whatever is running. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let active = self.shared.active.lock();
        tracing::info!("Shutdown requested while {}", active.mode());
        active.cancel();
    }
}

impl Shared {
    fn next_session(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish a new mode. Takes the `active` guard so the watch channel is
    /// updated in the same critical section as the state, then releases it
    /// before notifying the sink.
    fn publish_mode(&self, active: parking_lot::MutexGuard<'_, Active>, mode: Mode) {
        self.mode_tx.send_replace(mode);
        let version = self.mode_version.fetch_add(1, Ordering::SeqCst) + 1;
        drop(active);
        tracing::info!("Mode -> {}", mode);
        self.mode_notifier
            .deliver(version, mode, self.sink.as_ref());
    }

    /// Return to idle if `session` is still the active one
    fn finish(&self, session: u64, status: &str) {
        let mut active = self.active.lock();
        if active.session() != Some(session) {
            tracing::debug!("Ignoring completion of stale session {}", session);
            return;
        }
        *active = Active::Idle;
        self.publish_mode(active, Mode::Idle);
        self.sink.status(status);
    }

    fn ensure_buffer_writable(&self, action: &str) -> EngineResult<()> {
        let mode = self.active.lock().mode();
        match mode {
            mode @ (Mode::Recording | Mode::Playing) => Err(self.reject(action, mode)),
            _ => Ok(()),
        }
    }

    fn reject(&self, action: &str, mode: Mode) -> EngineError {
        let err = EngineError::Busy { mode };
        tracing::debug!("Rejected {} while {}", action, mode);
        self.sink.status(&format!("Cannot {action}: {err}"));
        err
    }

    async fn run_recording(self: Arc<Self>, session: u64, cancel: CancelToken) {
        if !sleep_or_cancel(self.timings.record_pre_roll(), &cancel).await {
            tracing::info!("Recording stopped during pre-roll");
            self.finish_recording(session, Macro::new());
            return;
        }

        let mut recording = match self.recorder.begin() {
            Ok(recording) => recording,
            Err(e) => {
                tracing::warn!("Failed to start recording: {}", e);
                self.finish(session, &format!("Failed to start recording: {e}"));
                return;
            }
        };
        tracing::info!("[{}] Capturing global input", recording.id());
        self.sink.status("Recording...");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = recording.next_event() => match event {
                    Some(event) => {
                        self.buffer.write().push(event);
                        self.sink.event_appended(&event.to_string());
                    }
                    None => break,
                },
            }
        }

        let live = recording.recorded().len();
        let recorded = self.recorder.end(recording);
        for event in &recorded.events()[live..] {
            self.sink.event_appended(&event.to_string());
        }
        self.finish_recording(session, recorded);
    }

    fn finish_recording(&self, session: u64, recorded: Macro) {
        let count = recorded.len();
        *self.buffer.write() = recorded;
        self.finish(
            session,
            &format!("Recording stopped. {count} events recorded."),
        );
        self.sink.playback_available(count > 0);
    }

    async fn run_playback(self: Arc<Self>, session: u64, snapshot: Macro, cancel: CancelToken) {
        tracing::info!(
            "Playing {} events over {} ms",
            snapshot.len(),
            snapshot.duration_ms()
        );
        let outcome = self.player.play(&snapshot, &cancel).await;
        let status = match outcome {
            PlaybackOutcome::Completed => "Playback finished.",
            PlaybackOutcome::Cancelled => "Playback cancelled.",
        };
        self.finish(session, status);
    }
}
