//! Focus Timer Library
//!
//! This library provides the core functionality for the focus timer CLI.
//! It includes:
//! - Timer engine driving focus and break intervals with cycle logic
//! - Per-task pomodoro ledger and the task collaborator seam
//! - Key-value persistence that survives daemon restarts
//! - Validated settings with partial updates
//! - Sound and desktop notification delivery
//! - IPC server/client for daemon-CLI communication

pub mod cli;
pub mod daemon;
pub mod ledger;
pub mod notification;
pub mod persistence;
pub mod settings;
pub mod sound;
pub mod tasks;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    IntervalKind, IpcRequest, IpcResponse, ResponseData, TaskId, TimerSession, TimerState,
    TrackedTaskView,
};

pub use daemon::{DaemonConfig, TimerEngine, TimerEvent};
pub use ledger::{TaskPomodoroLedger, TaskPomodoroRecord};
pub use notification::{
    MockNotificationBackend, NotificationBackend, NotificationError, NotificationGateway,
    Permission,
};
pub use persistence::{FileStore, KeyValueStore, MemoryStore, Persistence, PersistenceError};
pub use settings::{FieldError, Settings, SettingsError, SettingsPatch, SettingsStore};
pub use sound::{MockSoundPlayer, RodioSoundPlayer, SoundError, SoundKind, SoundPlayer};
pub use tasks::{TaskCatalog, TaskCollaborator, TaskInfo, TaskStatus};
