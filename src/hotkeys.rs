//! Global hotkey bindings
//!
//! Registering chords with the OS is the registrar's job. This module keeps
//! the chord-to-trigger table, reports registration failures as status text
//! and resolves an incoming chord to the trigger it fires.

use crate::config::HotkeyConfig;
use crate::controller::Trigger;
use crate::error::RegistrationError;
use crate::status::StatusSink;
use parking_lot::Mutex as ParkingMutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
    };

    pub const CTRL_ALT: Self = Self {
        ctrl: true,
        alt: true,
        shift: false,
    };
}

/// Keys offered for global shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    F(u8),
    Letter(char),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::F(n) => write!(f, "F{n}"),
            Key::Letter(c) => write!(f, "{c}"),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let mut chars = upper.chars();
        match (chars.next(), chars.as_str()) {
            (Some(c), "") if c.is_ascii_uppercase() => Ok(Key::Letter(c)),
            (Some('F'), digits) if !digits.is_empty() => match digits.parse::<u8>() {
                Ok(n @ 1..=12) => Ok(Key::F(n)),
                _ => Err(format!("unsupported function key: {s}")),
            },
            _ => Err(format!("unsupported key: {s}")),
        }
    }
}

/// Modifier set plus key, written as `Ctrl+Alt+R`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HotkeyBinding {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl HotkeyBinding {
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }

    /// Ctrl+F6 toggles clicking, Ctrl+Alt+R recording, Ctrl+Alt+P playback
    pub fn defaults() -> Vec<(Trigger, HotkeyBinding)> {
        vec![
            (
                Trigger::ToggleClick,
                HotkeyBinding::new(Modifiers::CTRL, Key::F(6)),
            ),
            (
                Trigger::ToggleRecord,
                HotkeyBinding::new(Modifiers::CTRL_ALT, Key::Letter('R')),
            ),
            (
                Trigger::TogglePlay,
                HotkeyBinding::new(Modifiers::CTRL_ALT, Key::Letter('P')),
            ),
        ]
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for HotkeyBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut modifiers = Modifiers::default();
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = parts
            .pop()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| format!("missing key in {s:?}"))?;

        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                other => return Err(format!("unknown modifier {other:?} in {s:?}")),
            }
        }

        Ok(Self {
            modifiers,
            key: key.parse()?,
        })
    }
}

impl TryFrom<String> for HotkeyBinding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HotkeyBinding> for String {
    fn from(binding: HotkeyBinding) -> Self {
        binding.to_string()
    }
}

/// OS-facing side of hotkey registration
pub trait HotkeyRegistrar: Send + Sync {
    fn register(&self, binding: &HotkeyBinding) -> Result<(), RegistrationError>;

    /// Best effort; failures are not reported
    fn unregister(&self, binding: &HotkeyBinding);
}

/// Registrar that keeps registrations in memory.
///
/// Chords marked as taken fail to register, as if another process owned them.
#[derive(Default)]
pub struct InMemoryRegistrar {
    registered: ParkingMutex<HashSet<HotkeyBinding>>,
    taken: ParkingMutex<HashSet<HotkeyBinding>>,
}

impl InMemoryRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_taken(&self, binding: HotkeyBinding) {
        self.taken.lock().insert(binding);
    }

    pub fn is_registered(&self, binding: &HotkeyBinding) -> bool {
        self.registered.lock().contains(binding)
    }
}

impl HotkeyRegistrar for InMemoryRegistrar {
    fn register(&self, binding: &HotkeyBinding) -> Result<(), RegistrationError> {
        if self.taken.lock().contains(binding) {
            return Err(RegistrationError {
                binding: binding.to_string(),
                reason: "it might be already in use".to_string(),
            });
        }
        self.registered.lock().insert(*binding);
        Ok(())
    }

    fn unregister(&self, binding: &HotkeyBinding) {
        self.registered.lock().remove(binding);
    }
}

pub struct HotkeyManager {
    registrar: Arc<dyn HotkeyRegistrar>,
    sink: Arc<dyn StatusSink>,
    bindings: ParkingMutex<HashMap<Trigger, HotkeyBinding>>,
}

impl HotkeyManager {
    pub fn new(registrar: Arc<dyn HotkeyRegistrar>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            registrar,
            sink,
            bindings: ParkingMutex::new(HashMap::new()),
        }
    }

    /// Bind `binding` to `trigger`, replacing any previous chord for it.
    ///
    /// A chord already bound to another trigger is refused and both bindings
    /// stay as they were. On any other failure the trigger is left unbound;
    /// the state machine is unaffected.
    pub fn bind(&self, trigger: Trigger, binding: HotkeyBinding) -> Result<(), RegistrationError> {
        let mut bindings = self.bindings.lock();
        let owner = bindings
            .iter()
            .find(|(t, b)| **t != trigger && **b == binding)
            .map(|(t, _)| *t);
        if let Some(owner) = owner {
            drop(bindings);
            let err = RegistrationError {
                binding: binding.to_string(),
                reason: format!("already bound to {owner:?}"),
            };
            tracing::warn!("{}", err);
            self.sink.status("Hotkey registration failed.");
            return Err(err);
        }

        if let Some(previous) = bindings.remove(&trigger) {
            self.registrar.unregister(&previous);
        }

        match self.registrar.register(&binding) {
            Ok(()) => {
                bindings.insert(trigger, binding);
                drop(bindings);
                tracing::info!("Hotkey {} bound to {:?}", binding, trigger);
                self.sink.status(&format!("Hotkey set ({binding})"));
                Ok(())
            }
            Err(e) => {
                drop(bindings);
                tracing::warn!("{}", e);
                self.sink.status("Hotkey registration failed.");
                Err(e)
            }
        }
    }

    /// Bind every configured hotkey, returning the failures
    pub fn install(&self, hotkeys: &[HotkeyConfig]) -> Vec<RegistrationError> {
        hotkeys
            .iter()
            .filter_map(|h| self.bind(h.trigger, h.binding).err())
            .collect()
    }

    pub fn resolve(&self, binding: &HotkeyBinding) -> Option<Trigger> {
        self.bindings
            .lock()
            .iter()
            .find(|(_, b)| *b == binding)
            .map(|(trigger, _)| *trigger)
    }

    pub fn binding_for(&self, trigger: Trigger) -> Option<HotkeyBinding> {
        self.bindings.lock().get(&trigger).copied()
    }

    /// Unregister everything. Used at shutdown, failures are ignored.
    pub fn release_all(&self) {
        let mut bindings = self.bindings.lock();
        for (_, binding) in bindings.drain() {
            self.registrar.unregister(&binding);
        }
        tracing::debug!("Released all hotkeys");
    }
}
