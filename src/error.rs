//! Error taxonomy for the engine
//!
//! Every error here is recovered at the boundary where it is detected. The
//! `Display` text doubles as the status line shown to the user.

use crate::controller::Mode;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid click settings or an unreadable configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Please enter a valid interval (>= 1 ms), got {0:?}.")]
    InvalidInterval(String),

    #[error("Select a mouse button first.")]
    NoButton,

    #[error("Failed to read config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A global hotkey could not be bound
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to register hotkey {binding}: {reason}")]
pub struct RegistrationError {
    pub binding: String,
    pub reason: String,
}

/// Saving or loading a macro failed
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the mode controller and its services
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("No macro recorded/loaded.")]
    EmptyMacro,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Input backend error: {0}")]
    Backend(String),

    #[error("Not available while {mode}")]
    Busy { mode: Mode },
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
