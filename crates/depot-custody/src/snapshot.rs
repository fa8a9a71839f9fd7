//! Persistable chain snapshots.
//!
//! A [`Snapshot`] captures the configuration, the checkpointed state and
//! the event log of a [`Chain`]. Receive hooks are code, not data, and are
//! not part of it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use depot_core::EventLog;

use crate::chain::{Chain, State};
use crate::config::CustodyConfig;
use crate::error::SnapshotError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub config: CustodyConfig,
    pub state: State,
    pub log: EventLog,
}

impl Snapshot {
    /// Write as pretty-printed JSON to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), events = self.log.len(), "snapshot: saved");
        Ok(())
    }

    /// Read a snapshot previously written by [`save`](Snapshot::save).
    ///
    /// The embedded configuration is validated like a loaded config file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        snapshot.config.validate()?;
        debug!(path = %path.display(), events = snapshot.log.len(), "snapshot: loaded");
        Ok(snapshot)
    }
}

impl Chain {
    pub fn snapshot(&self) -> Snapshot {
        let (config, state, log) = self.parts();
        Snapshot {
            config: config.clone(),
            state: state.clone(),
            log: log.clone(),
        }
    }

    /// Rebuild a chain from `snapshot`, with no receive hooks attached.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Chain::with_state(snapshot.config, snapshot.state, snapshot.log)
    }
}
