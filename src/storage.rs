//! Macro persistence
//!
//! Macros are stored as a pretty-printed JSON array of events.

use crate::capture::Macro;
use crate::error::PersistenceError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait MacroStore: Send + Sync {
    async fn save(&self, path: &Path, recording: &Macro) -> Result<(), PersistenceError>;

    /// Load a macro. Nothing is returned unless the whole file parsed.
    async fn load(&self, path: &Path) -> Result<Macro, PersistenceError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMacroStore;

#[async_trait]
impl MacroStore for JsonMacroStore {
    async fn save(&self, path: &Path, recording: &Macro) -> Result<(), PersistenceError> {
        let data = serde_json::to_vec_pretty(recording).map_err(|source| {
            PersistenceError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(path, data)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!("Saved {} events to {:?}", recording.len(), path);
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<Macro, PersistenceError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| PersistenceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let recording: Macro =
            serde_json::from_slice(&content).map_err(|source| PersistenceError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!("Loaded {} events from {:?}", recording.len(), path);
        Ok(recording)
    }
}
