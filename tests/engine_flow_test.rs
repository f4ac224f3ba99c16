//! End-to-end flows through the mode controller with the in-process backend.

use autoclicker_lib::capture::{
    BackendAction, InputEvent, Macro, MouseButton, PointerSample, SimulatedBackend,
};
use autoclicker_lib::status::MemorySink;
use autoclicker_lib::storage::{JsonMacroStore, MacroStore};
use autoclicker_lib::{
    ClickSettings, EngineConfig, EngineError, Mode, ModeController, Trigger, TriggerOutcome,
    TriggerSource,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Harness {
    controller: ModeController,
    backend: Arc<SimulatedBackend>,
    sink: Arc<MemorySink>,
}

fn harness(click: ClickSettings) -> Harness {
    let backend = Arc::new(SimulatedBackend::new());
    let sink = Arc::new(MemorySink::new());
    let config = EngineConfig {
        click,
        ..EngineConfig::default()
    };
    Harness {
        controller: ModeController::new(config, backend.clone(), sink.clone()),
        backend,
        sink,
    }
}

fn at(x: i32, y: i32, button: MouseButton) -> PointerSample {
    PointerSample { x, y, button }
}

async fn record(h: &Harness, script: &[(u64, PointerSample, bool)]) {
    h.controller
        .handle(Trigger::ToggleRecord, TriggerSource::Hotkey)
        .unwrap();
    h.backend.wait_for_subscriber().await;

    let mut elapsed = 0;
    for (offset, sample, is_down) in script {
        tokio::time::sleep(Duration::from_millis(offset - elapsed)).await;
        elapsed = *offset;
        h.backend.emit(*sample, *is_down);
    }

    h.controller
        .handle(Trigger::ToggleRecord, TriggerSource::Hotkey)
        .unwrap();
    h.controller.wait_until_idle().await;
}

#[tokio::test(start_paused = true)]
async fn test_click_session_of_220ms_yields_four_or_five_pairs() {
    let h = harness(ClickSettings::new(50, MouseButton::Left, false));

    h.controller
        .handle(Trigger::ToggleClick, TriggerSource::Hotkey)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(220)).await;
    h.controller
        .handle(Trigger::ToggleClick, TriggerSource::Hotkey)
        .unwrap();
    h.controller.wait_until_idle().await;

    let presses = h.backend.presses(MouseButton::Left).len();
    let releases = h
        .backend
        .calls()
        .iter()
        .filter(|c| c.action == BackendAction::Release(MouseButton::Left))
        .count();
    assert!((4..=5).contains(&presses), "got {presses}");
    assert_eq!(presses, releases);

    // Nothing is synthesized once the loop has reported its stop.
    let settled = h.backend.calls().len();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.backend.calls().len(), settled);
}

#[tokio::test(start_paused = true)]
async fn test_recorded_offsets_match_notification_times() {
    let h = harness(ClickSettings::default());
    let script = [
        (0, at(1, 1, MouseButton::Left), true),
        (35, at(1, 1, MouseButton::Left), false),
        (35, at(400, 300, MouseButton::Right), true),
        (410, at(402, 301, MouseButton::Right), false),
        (1000, at(0, 0, MouseButton::Middle), true),
    ];

    record(&h, &script).await;

    let recorded = h.controller.macro_snapshot();
    assert_eq!(recorded.len(), script.len());
    for (event, (offset, sample, is_down)) in recorded.events().iter().zip(script.iter()) {
        assert_eq!(event.offset_ms, *offset);
        assert_eq!((event.x, event.y, event.button), (sample.x, sample.y, sample.button));
        assert_eq!(event.is_down, *is_down);
    }
    assert_eq!(h.sink.event_lines(), recorded.display_lines());
    assert!(h.sink.has_status("Recording..."));
}

#[tokio::test(start_paused = true)]
async fn test_record_stop_play_scenario() {
    let h = harness(ClickSettings::default());
    record(
        &h,
        &[
            (0, at(10, 10, MouseButton::Left), true),
            (40, at(10, 10, MouseButton::Left), false),
        ],
    )
    .await;
    h.backend.clear_calls();

    let start = Instant::now();
    h.controller
        .handle(Trigger::TogglePlay, TriggerSource::Ui)
        .unwrap();
    h.controller.wait_until_idle().await;

    let calls = h.backend.synthesized();
    let actions: Vec<_> = calls.iter().map(|c| c.action).collect();
    assert_eq!(
        actions,
        vec![
            BackendAction::MoveCursor { x: 10, y: 10 },
            BackendAction::Press(MouseButton::Left),
            BackendAction::MoveCursor { x: 10, y: 10 },
            BackendAction::Release(MouseButton::Left),
        ]
    );
    assert_eq!(calls[1].at - start, Duration::ZERO);
    assert_eq!(calls[3].at - start, Duration::from_millis(40));
}

#[tokio::test(start_paused = true)]
async fn test_stop_mid_playback_reports_cancel() {
    let h = harness(ClickSettings::default());
    record(
        &h,
        &[
            (0, at(0, 0, MouseButton::Left), true),
            (100, at(0, 0, MouseButton::Left), false),
            (250, at(5, 5, MouseButton::Left), true),
        ],
    )
    .await;
    h.backend.clear_calls();

    h.controller
        .handle(Trigger::TogglePlay, TriggerSource::Ui)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let outcome = h
        .controller
        .handle(Trigger::Stop, TriggerSource::Ui)
        .unwrap();
    assert_eq!(outcome, TriggerOutcome::Stopping(Mode::Playing));
    h.controller.wait_until_idle().await;

    assert_eq!(h.backend.presses(MouseButton::Left).len(), 1);
    assert_eq!(h.sink.last_status().as_deref(), Some("Playback cancelled."));
}

#[tokio::test(start_paused = true)]
async fn test_play_hotkey_toggles_playback_off() {
    let h = harness(ClickSettings::default());
    record(
        &h,
        &[
            (0, at(0, 0, MouseButton::Left), true),
            (5000, at(0, 0, MouseButton::Left), false),
        ],
    )
    .await;

    h.controller
        .handle(Trigger::TogglePlay, TriggerSource::Hotkey)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let outcome = h
        .controller
        .handle(Trigger::TogglePlay, TriggerSource::Hotkey)
        .unwrap();

    assert_eq!(outcome, TriggerOutcome::Stopping(Mode::Playing));
    h.controller.wait_until_idle().await;
}

#[tokio::test(start_paused = true)]
async fn test_interleaved_triggers_keep_modes_exclusive() {
    let h = harness(ClickSettings::new(20, MouseButton::Right, false));
    let mut modes = h.controller.subscribe_mode();
    let observed = tokio::spawn(async move {
        let mut seen = vec![*modes.borrow()];
        while modes.changed().await.is_ok() {
            seen.push(*modes.borrow());
        }
        seen
    });

    let sequence = [
        Trigger::ToggleClick,
        Trigger::ToggleRecord,
        Trigger::TogglePlay,
        Trigger::Stop,
        Trigger::ToggleClick,
        Trigger::ToggleRecord,
        Trigger::ToggleClick,
        Trigger::TogglePlay,
        Trigger::Stop,
        Trigger::TogglePlay,
        Trigger::ToggleRecord,
        Trigger::ToggleClick,
    ];

    for trigger in sequence {
        let before = h.controller.mode();
        match h.controller.handle(trigger, TriggerSource::Hotkey) {
            Ok(TriggerOutcome::Ignored(mode)) => {
                assert_eq!(mode, before);
                assert_eq!(h.controller.mode(), before);
            }
            Ok(TriggerOutcome::Started(mode)) => assert_eq!(before, Mode::Idle, "{mode} from {before}"),
            Ok(TriggerOutcome::Stopping(mode)) => assert_eq!(mode, before),
            Err(EngineError::EmptyMacro) => assert_eq!(h.controller.mode(), Mode::Idle),
            Err(e) => panic!("unexpected error: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        if h.controller.mode() != Mode::Idle && h.controller.mode() != Mode::Clicking {
            // Let recording and playback sessions run a little before the next trigger.
            tokio::time::sleep(Duration::from_millis(1600)).await;
        }
    }

    h.controller.shutdown();
    h.controller.wait_until_idle().await;
    drop(h.controller);

    // Every change passes through Idle: no two sessions are ever back to back.
    let seen = observed.await.unwrap();
    for pair in seen.windows(2) {
        assert!(
            pair[0] == Mode::Idle || pair[1] == Mode::Idle,
            "direct transition {} -> {}",
            pair[0],
            pair[1]
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_save_and_load_round_trip_through_controller() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");

    let h = harness(ClickSettings::default());
    record(
        &h,
        &[
            (0, at(-5, 7, MouseButton::Middle), true),
            (12, at(-5, 7, MouseButton::Middle), false),
        ],
    )
    .await;
    let original = h.controller.macro_snapshot();

    assert_eq!(h.controller.save_macro(&path).await.unwrap(), 2);
    assert!(h
        .sink
        .has_status(&format!("Saved macro to {}", path.display())));

    let other = harness(ClickSettings::default());
    assert_eq!(other.controller.load_macro(&path).await.unwrap(), 2);
    assert_eq!(other.controller.macro_snapshot(), original);
    assert_eq!(other.sink.event_lines(), original.display_lines());
    assert_eq!(other.sink.playback_available(), Some(true));
}

#[tokio::test]
async fn test_failed_load_keeps_existing_macro() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");

    let recording = Macro::from_events(vec![InputEvent::new(
        0,
        at(3, 3, MouseButton::Left),
        true,
    )]);
    JsonMacroStore.save(&good, &recording).await.unwrap();
    std::fs::write(&bad, "[{\"DelayMs\": 0}, {\"Button\": 7}]").unwrap();

    let h = harness(ClickSettings::default());
    h.controller.load_macro(&good).await.unwrap();

    let result = h.controller.load_macro(&bad).await;
    assert!(matches!(result, Err(EngineError::Persistence(_))));
    assert_eq!(h.controller.macro_snapshot(), recording);
    assert!(h.sink.last_status().unwrap().starts_with("Failed to load:"));

    let missing = h.controller.load_macro(&dir.path().join("missing.json")).await;
    assert!(matches!(missing, Err(EngineError::Persistence(_))));
    assert_eq!(h.controller.macro_snapshot(), recording);
}

#[tokio::test(start_paused = true)]
async fn test_load_rejected_while_playing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");

    let h = harness(ClickSettings::default());
    record(
        &h,
        &[
            (0, at(0, 0, MouseButton::Left), true),
            (3000, at(0, 0, MouseButton::Left), false),
        ],
    )
    .await;
    h.controller.save_macro(&path).await.unwrap();
    let before = h.controller.macro_snapshot();

    h.controller
        .handle(Trigger::TogglePlay, TriggerSource::Ui)
        .unwrap();
    let result = h.controller.load_macro(&path).await;

    assert!(matches!(result, Err(EngineError::Busy { mode: Mode::Playing })));
    assert_eq!(h.controller.macro_snapshot(), before);

    h.controller.handle(Trigger::Stop, TriggerSource::Ui).unwrap();
    h.controller.wait_until_idle().await;
}

#[tokio::test(start_paused = true)]
async fn test_other_triggers_ignored_while_playing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");
    let recording = Macro::from_events(vec![
        InputEvent::new(0, at(4, 4, MouseButton::Left), true),
        InputEvent::new(2000, at(4, 4, MouseButton::Left), false),
    ]);
    JsonMacroStore.save(&path, &recording).await.unwrap();

    let h = harness(ClickSettings::new(20, MouseButton::Right, false));
    h.controller.load_macro(&path).await.unwrap();
    let started = h
        .controller
        .handle(Trigger::TogglePlay, TriggerSource::Hotkey)
        .unwrap();
    assert_eq!(started, TriggerOutcome::Started(Mode::Playing));
    tokio::time::sleep(Duration::from_millis(100)).await;

    for source in [TriggerSource::Ui, TriggerSource::Hotkey] {
        for trigger in [Trigger::ToggleClick, Trigger::ToggleRecord] {
            let outcome = h.controller.handle(trigger, source).unwrap();
            assert_eq!(outcome, TriggerOutcome::Ignored(Mode::Playing));
            assert_eq!(h.controller.mode(), Mode::Playing);
        }
    }
    let busy = h.controller.load_macro(&path).await;
    assert!(matches!(busy, Err(EngineError::Busy { mode: Mode::Playing })));
    assert_eq!(h.controller.mode(), Mode::Playing);

    h.controller.wait_until_idle().await;
    assert!(h.backend.presses(MouseButton::Right).is_empty());
    assert!(!h.backend.has_subscribers());
    assert_eq!(h.sink.last_status().as_deref(), Some("Playback finished."));
    assert_eq!(h.controller.macro_snapshot(), recording);
}

#[tokio::test(start_paused = true)]
async fn test_load_rejected_while_recording() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");
    let stored = Macro::from_events(vec![InputEvent::new(
        0,
        at(9, 9, MouseButton::Right),
        true,
    )]);
    JsonMacroStore.save(&path, &stored).await.unwrap();

    let h = harness(ClickSettings::default());
    h.controller
        .handle(Trigger::ToggleRecord, TriggerSource::Ui)
        .unwrap();
    h.backend.wait_for_subscriber().await;
    h.backend.emit(at(1, 2, MouseButton::Left), true);

    let busy = h.controller.load_macro(&path).await;
    assert!(matches!(busy, Err(EngineError::Busy { mode: Mode::Recording })));
    assert_eq!(
        h.sink.last_status().as_deref(),
        Some("Cannot load: Not available while recording")
    );
    assert_eq!(h.controller.mode(), Mode::Recording);

    h.controller.handle(Trigger::Stop, TriggerSource::Ui).unwrap();
    h.controller.wait_until_idle().await;

    let recorded = h.controller.macro_snapshot();
    assert_eq!(recorded.len(), 1);
    assert_eq!((recorded.events()[0].x, recorded.events()[0].y), (1, 2));
}

#[tokio::test]
async fn test_save_refuses_empty_macro() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(ClickSettings::default());

    let result = h.controller.save_macro(&dir.path().join("empty.json")).await;

    assert!(matches!(result, Err(EngineError::EmptyMacro)));
    assert_eq!(h.sink.last_status().as_deref(), Some("No macro to save."));
}
