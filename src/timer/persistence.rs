use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::storage::{KeyValueStore, StorageError};
use crate::{log_info, log_warn};

use super::state::{ActiveSession, TimerPhase};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_STORAGE_KEY: &str = "activeTimer";

/// Reads and writes the single persisted session under one fixed key.
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads and rehydrates the stored session. Anything unreadable is
    /// dropped from storage and treated as idle.
    pub fn load(&self, now: DateTime<Utc>) -> TimerPhase {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return TimerPhase::Idle,
            Err(err) => {
                log_warn!("Failed to read persisted timer '{}': {err}", self.key);
                return TimerPhase::Idle;
            }
        };

        match serde_json::from_str::<ActiveSession>(&raw) {
            Ok(session) => {
                let phase = TimerPhase::rehydrate(session, now);
                if let Some(session) = phase.session() {
                    log_info!(
                        "Restored {} timer for task {} at {}s",
                        session.status.as_str(),
                        session.task_id,
                        session.elapsed_seconds
                    );
                }
                phase
            }
            Err(err) => {
                log_warn!("Discarding corrupt persisted timer '{}': {err}", self.key);
                if let Err(err) = self.store.remove(&self.key) {
                    log_warn!("Failed to remove corrupt timer '{}': {err}", self.key);
                }
                TimerPhase::Idle
            }
        }
    }

    /// Writes the whole session, or removes the key when idle.
    pub fn save(&self, phase: &TimerPhase) -> Result<(), StorageError> {
        match phase.session() {
            Some(session) => {
                let serialized = serde_json::to_string(session)?;
                self.store.set(&self.key, &serialized)
            }
            None => self.store.remove(&self.key),
        }
    }
}
