//! Snapshot and restore of all timer state.
//!
//! Every mutation of the session, settings or ledger is mirrored into a
//! [`KeyValueStore`] as one batch keyed by logical field name. On start the
//! keys are read back; anything missing or malformed falls back to defaults.
//! This layer holds no timer logic.

mod error;
mod store;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub use error::PersistenceError;
pub use store::{FileStore, KeyValueStore, MemoryStore};

use crate::ledger::{TaskPomodoroLedger, TaskPomodoroRecord};
use crate::settings::Settings;
use crate::types::{TaskId, TimerSession, TimerState};

/// Persisted keys.
pub mod keys {
    pub const SETTINGS: &str = "settings";
    pub const STATE: &str = "session.state";
    pub const SECONDS_LEFT: &str = "session.secondsLeft";
    pub const TARGET_SECONDS: &str = "session.targetSeconds";
    pub const PREVIOUS_STATE: &str = "session.previousState";
    pub const COMPLETED_POMODOROS: &str = "session.completedPomodoros";
    pub const COMPLETED_CYCLES: &str = "session.completedCycles";
    pub const CURRENT_TASK_ID: &str = "session.currentTaskId";
    pub const LEDGER_RECORDS: &str = "ledger.records[]";
    pub const LEDGER_ACTIVE_TASK_IDS: &str = "ledger.activeTaskIds[]";
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub settings: Settings,
    pub session: TimerSession,
    pub ledger: TaskPomodoroLedger,
}

/// Mirrors timer state into a key/value store.
pub struct Persistence {
    store: Box<dyn KeyValueStore>,
}

impl Persistence {
    /// Wraps a store.
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// A persistence layer backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Writes a full snapshot as one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the batch.
    pub fn save(
        &mut self,
        settings: &Settings,
        session: &TimerSession,
        ledger: &TaskPomodoroLedger,
    ) -> Result<(), PersistenceError> {
        let entries = encode(settings, session, ledger)?;
        self.store.put_batch(entries)
    }

    /// Reads the last snapshot, repairing anything that cannot be trusted.
    pub fn restore(&self) -> Snapshot {
        Snapshot {
            settings: self.restore_settings(),
            session: self.restore_session(),
            ledger: self.restore_ledger(),
        }
    }

    fn restore_settings(&self) -> Settings {
        match read::<Settings>(self.store.as_ref(), keys::SETTINGS) {
            Ok(Some(settings)) => match settings.validate() {
                Ok(()) => settings,
                Err(e) => {
                    warn!("Persisted settings out of bounds, using defaults: {}", e);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!("Persisted settings unreadable, using defaults: {}", e);
                Settings::default()
            }
        }
    }

    fn restore_ledger(&self) -> TaskPomodoroLedger {
        let store = self.store.as_ref();
        let records = read::<Vec<TaskPomodoroRecord>>(store, keys::LEDGER_RECORDS);
        let active = read::<Vec<TaskId>>(store, keys::LEDGER_ACTIVE_TASK_IDS);

        match (records, active) {
            (Ok(records), Ok(active)) => TaskPomodoroLedger::from_parts(
                records.unwrap_or_default(),
                active.unwrap_or_default(),
            ),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Persisted ledger unreadable, starting empty: {}", e);
                TaskPomodoroLedger::new()
            }
        }
    }

    fn restore_session(&self) -> TimerSession {
        match decode_session(self.store.as_ref()) {
            Ok(Some(session)) => {
                debug!(state = session.state.as_str(), "Restored session");
                session
            }
            Ok(None) => TimerSession::default(),
            Err(reason) => {
                warn!("Persisted session discarded, resetting to idle: {}", reason);
                TimerSession::default()
            }
        }
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}

fn encode(
    settings: &Settings,
    session: &TimerSession,
    ledger: &TaskPomodoroLedger,
) -> Result<Vec<(String, String)>, PersistenceError> {
    fn entry<T: Serialize + ?Sized>(
        key: &str,
        value: &T,
    ) -> Result<(String, String), PersistenceError> {
        Ok((key.to_string(), serde_json::to_string(value)?))
    }

    let previous = session.state.previous_state().map(|kind| kind.as_str());

    Ok(vec![
        entry(keys::SETTINGS, settings)?,
        entry(keys::STATE, session.state.as_str())?,
        entry(keys::SECONDS_LEFT, &session.seconds_left)?,
        entry(keys::TARGET_SECONDS, &session.target_seconds)?,
        entry(keys::PREVIOUS_STATE, &previous)?,
        entry(keys::COMPLETED_POMODOROS, &session.completed_pomodoros)?,
        entry(keys::COMPLETED_CYCLES, &session.completed_cycles)?,
        entry(keys::CURRENT_TASK_ID, &session.current_task_id)?,
        entry(keys::LEDGER_RECORDS, ledger.records())?,
        entry(keys::LEDGER_ACTIVE_TASK_IDS, ledger.active_task_ids())?,
    ])
}

fn read<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, serde_json::Error> {
    store
        .get(key)
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
}

/// Decodes the session keys as one unit.
///
/// Returns `Ok(None)` when nothing was ever persisted and `Err` with a reason
/// when the stored fields do not form a valid session.
fn decode_session(store: &dyn KeyValueStore) -> Result<Option<TimerSession>, String> {
    let field = |key: &str| format!("{key}: malformed value");

    let Some(state) = read::<String>(store, keys::STATE).map_err(|_| field(keys::STATE))? else {
        return Ok(None);
    };
    let previous = read::<Option<String>>(store, keys::PREVIOUS_STATE)
        .map_err(|_| field(keys::PREVIOUS_STATE))?
        .flatten();
    let state = TimerState::from_labels(&state, previous.as_deref()).ok_or_else(|| {
        format!(
            "invalid state '{}' with previous state {:?}",
            state, previous
        )
    })?;

    let seconds_left = read::<u32>(store, keys::SECONDS_LEFT)
        .map_err(|_| field(keys::SECONDS_LEFT))?
        .unwrap_or(0);
    let target_seconds = read::<u32>(store, keys::TARGET_SECONDS)
        .map_err(|_| field(keys::TARGET_SECONDS))?
        .unwrap_or(0);
    let completed_pomodoros = read::<u32>(store, keys::COMPLETED_POMODOROS)
        .map_err(|_| field(keys::COMPLETED_POMODOROS))?
        .unwrap_or(0);
    let completed_cycles = read::<u32>(store, keys::COMPLETED_CYCLES)
        .map_err(|_| field(keys::COMPLETED_CYCLES))?
        .unwrap_or(0);
    let current_task_id = read::<Option<TaskId>>(store, keys::CURRENT_TASK_ID)
        .map_err(|_| field(keys::CURRENT_TASK_ID))?
        .flatten();

    let session = TimerSession {
        state,
        seconds_left,
        target_seconds,
        completed_pomodoros,
        completed_cycles,
        current_task_id,
    };

    if !session.is_consistent() {
        return Err(format!(
            "inconsistent timing: state={} secondsLeft={} targetSeconds={}",
            session.state.as_str(),
            seconds_left,
            target_seconds
        ));
    }
    // A running or paused interval with nothing left cannot make progress.
    if !session.state.is_idle() && seconds_left == 0 {
        return Err(format!(
            "{} interval has no time left",
            session.state.as_str()
        ));
    }

    Ok(Some(session))
}
