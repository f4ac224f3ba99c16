//! Headless driver
//!
//! Runs the engine against the in-process backend and reads commands from
//! stdin, one per line. Global input can be injected with `down`/`up` so
//! recording and playback can be exercised without a desktop session.

use anyhow::{bail, Context, Result};
use autoclicker_lib::capture::{MouseButton, PointerSample, SimulatedBackend};
use autoclicker_lib::hotkeys::{HotkeyBinding, HotkeyManager, InMemoryRegistrar};
use autoclicker_lib::status::TracingSink;
use autoclicker_lib::{EngineConfig, ModeController, Trigger, TriggerSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: click | record | stop | play | hotkey <chord> | \
down|up <button> <x> <y> | interval <ms> | button <left|right|middle> | \
hold on|off | save <path> | load <path> | mode | list | quit";

enum Flow {
    Continue,
    Quit,
}

struct Driver {
    controller: ModeController,
    hotkeys: HotkeyManager,
    backend: Arc<SimulatedBackend>,
}

impl Driver {
    async fn run_command(&self, line: &str) -> Result<Flow> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            return Ok(Flow::Continue);
        };

        match (command, args) {
            ("click", []) => self.trigger(Trigger::ToggleClick, TriggerSource::Ui),
            ("record", []) => self.trigger(Trigger::ToggleRecord, TriggerSource::Ui),
            ("stop", []) => self.trigger(Trigger::Stop, TriggerSource::Ui),
            ("play", []) => self.trigger(Trigger::TogglePlay, TriggerSource::Ui),
            ("hotkey", [chord]) => {
                let binding: HotkeyBinding = chord.parse().map_err(anyhow::Error::msg)?;
                match self.hotkeys.resolve(&binding) {
                    Some(trigger) => self.trigger(trigger, TriggerSource::Hotkey),
                    None => bail!("no trigger bound to {binding}"),
                }
            }
            ("down" | "up", [button, x, y]) => {
                let sample = PointerSample {
                    x: x.parse().context("x must be an integer")?,
                    y: y.parse().context("y must be an integer")?,
                    button: button.parse().map_err(anyhow::Error::msg)?,
                };
                self.backend.emit(sample, command == "down");
            }
            ("interval", [ms]) => {
                let mut settings = self.controller.click_settings();
                settings.interval = ms.to_string();
                self.controller.set_click_settings(settings);
            }
            ("button", [name]) => {
                let button: MouseButton = name.parse().map_err(anyhow::Error::msg)?;
                let mut settings = self.controller.click_settings();
                settings.button = Some(button);
                self.controller.set_click_settings(settings);
            }
            ("hold", [flag]) => {
                let mut settings = self.controller.click_settings();
                settings.hold_down = match *flag {
                    "on" => true,
                    "off" => false,
                    other => bail!("expected on or off, got {other}"),
                };
                self.controller.set_click_settings(settings);
            }
            ("save", [path]) => {
                self.controller.save_macro(Path::new(path)).await?;
            }
            ("load", [path]) => {
                self.controller.load_macro(Path::new(path)).await?;
            }
            ("mode", []) => println!("{}", self.controller.mode()),
            ("list", []) => {
                for line in self.controller.display_lines() {
                    println!("{line}");
                }
            }
            ("quit" | "exit", []) => return Ok(Flow::Quit),
            _ => println!("{HELP}"),
        }
        Ok(Flow::Continue)
    }

    fn trigger(&self, trigger: Trigger, source: TriggerSource) {
        // Failures are already reported on the status channel.
        match self.controller.handle(trigger, source) {
            Ok(outcome) => println!("{}", outcome.mode()),
            Err(e) => tracing::debug!("{:?} rejected: {}", trigger, e),
        }
    }
}

fn config_path() -> Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    match (args.next().as_deref(), args.next()) {
        (None, _) => Ok(None),
        (Some("--config"), Some(path)) => Ok(Some(PathBuf::from(path))),
        _ => bail!("usage: autoclicker [--config <path>]"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    autoclicker_lib::init_tracing();
    tracing::info!("Starting autoclicker v{}", env!("CARGO_PKG_VERSION"));

    let config = match config_path()? {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let backend = Arc::new(SimulatedBackend::new());
    let sink = Arc::new(TracingSink);
    let controller = ModeController::new(config.clone(), backend.clone(), sink.clone());
    let hotkeys = HotkeyManager::new(Arc::new(InMemoryRegistrar::new()), sink);
    hotkeys.install(&config.hotkeys);

    let driver = Driver {
        controller,
        hotkeys,
        backend,
    };
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match driver.run_command(line.trim()).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => tracing::warn!("{:#}", e),
        }
    }

    driver.controller.shutdown();
    driver.hotkeys.release_all();
    driver.controller.wait_until_idle().await;
    tracing::info!("Bye");
    Ok(())
}
