//! Read-only access to tasks owned by the task backend.
//!
//! The timer only needs a task's identity, title and status: the title for
//! notifications and display, the status to decide whether a task may be
//! tracked at all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::TaskId;

/// Status of a task in the task backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Todo,
    #[serde(alias = "in-progress")]
    InProgress,
    Review,
    Completed,
    Done,
    /// Any status this client does not know about
    #[serde(other)]
    Other,
}

impl TaskStatus {
    /// Returns true for statuses that end a task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Done)
    }
}

/// The subset of a task the timer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

impl TaskInfo {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
        }
    }
}

/// Source of task identity and titles.
pub trait TaskCollaborator: Send + Sync {
    /// Looks up a task by ID.
    fn get_task(&self, task_id: &str) -> Option<TaskInfo>;

    /// Returns true if the task exists and is not in a terminal status.
    fn is_trackable(&self, task_id: &str) -> bool {
        self.get_task(task_id)
            .is_some_and(|task| !task.status.is_terminal())
    }
}

/// Errors that can occur while loading a task catalog.
#[derive(Debug, Error)]
pub enum TaskCatalogError {
    /// The catalog file could not be read.
    #[error("タスクファイルを読み込めません: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not a JSON array of tasks.
    #[error("タスクファイルの形式が不正です: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory task catalog, optionally loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<TaskId, TaskInfo>,
}

impl TaskCatalog {
    /// Creates a catalog from tasks.
    pub fn from_tasks(tasks: impl IntoIterator<Item = TaskInfo>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Loads a catalog from a JSON array file. A missing file yields an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, TaskCatalogError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No task catalog at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(TaskCatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let tasks: Vec<TaskInfo> =
            serde_json::from_str(&raw).map_err(|source| TaskCatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_tasks(tasks))
    }

    /// Inserts or replaces a task.
    pub fn insert(&mut self, task: TaskInfo) {
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TaskCollaborator for TaskCatalog {
    fn get_task(&self, task_id: &str) -> Option<TaskInfo> {
        self.tasks.get(task_id).cloned()
    }
}
