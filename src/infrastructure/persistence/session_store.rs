//! File-backed session flag store
//!
//! Mirrors the calling-in-progress flag and the active-call snapshot
//! into a JSON file under the user's data directory. These are restart
//! hints, not authoritative state: a missing or corrupt file is treated
//! as an empty session, never an error.

use crate::domain::active_call::ActiveCallSnapshot;
use crate::domain::gateway::SessionFlagStore;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionState {
    #[serde(default)]
    calling_in_progress: bool,
    #[serde(default)]
    active_calls: Vec<ActiveCallSnapshot>,
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the platform data directory, e.g.
    /// `~/.local/share/callboard/session.json`
    pub fn at_default_location() -> Result<Self> {
        let dir = dirs::data_dir().or_else(dirs::home_dir).ok_or_else(|| {
            DomainError::StateStore("Could not determine a state directory".to_string())
        })?;
        Ok(Self::new(dir.join("callboard").join("session.json")))
    }

    fn read_state(&self) -> SessionState {
        fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn write_state(&self, state: &SessionState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DomainError::StateStore(format!(
                    "Failed creating state dir {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| DomainError::StateStore(format!("Failed encoding state: {}", e)))?;
        fs::write(&self.path, json).map_err(|e| {
            DomainError::StateStore(format!(
                "Failed writing state file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl SessionFlagStore for FileSessionStore {
    fn set_calling_in_progress(&self, active: bool) -> Result<()> {
        let mut state = self.read_state();
        state.calling_in_progress = active;
        self.write_state(&state)
    }

    fn clear_calling_in_progress(&self) -> Result<()> {
        self.set_calling_in_progress(false)
    }

    fn calling_in_progress(&self) -> bool {
        self.read_state().calling_in_progress
    }

    fn save_active_calls(&self, snapshot: Vec<ActiveCallSnapshot>) -> Result<()> {
        let mut state = self.read_state();
        state.active_calls = snapshot;
        self.write_state(&state)
    }

    fn load_active_calls(&self) -> Result<Vec<ActiveCallSnapshot>> {
        Ok(self.read_state().active_calls)
    }

    fn clear_active_calls(&self) -> Result<()> {
        let mut state = self.read_state();
        state.active_calls.clear();
        self.write_state(&state)
    }
}
