//! Per-task pomodoro counters.
//!
//! The ledger keeps one [`TaskPomodoroRecord`] per tracked task plus the
//! ordered set of task IDs under active tracking. No operation fails on an
//! unknown task ID; unknown IDs are simply ignored.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::TaskId;

/// Estimate used when a task is tracked without one.
pub const DEFAULT_ESTIMATE: u32 = 1;

/// Estimated and completed pomodoros of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPomodoroRecord {
    /// Task identifier
    pub task_id: TaskId,
    /// Estimated pomodoros (at least 1, advisory only)
    pub estimated_pomodoros: u32,
    /// Completed pomodoros
    pub completed_pomodoros: u32,
}

impl TaskPomodoroRecord {
    /// Creates a record with no completed pomodoros.
    pub fn new(task_id: impl Into<TaskId>, estimate: u32) -> Self {
        Self {
            task_id: task_id.into(),
            estimated_pomodoros: estimate.max(1),
            completed_pomodoros: 0,
        }
    }

    /// Returns `completed / estimated * 100`. Exceeds 100 once the estimate is overrun.
    pub fn progress_percent(&self) -> f64 {
        f64::from(self.completed_pomodoros) / f64::from(self.estimated_pomodoros.max(1)) * 100.0
    }
}

/// Tracked tasks and their counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPomodoroLedger {
    records: Vec<TaskPomodoroRecord>,
    active: Vec<TaskId>,
}

impl TaskPomodoroLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from persisted parts.
    ///
    /// Duplicate records and active IDs are dropped (first occurrence wins)
    /// and zero estimates are raised to 1.
    pub fn from_parts(records: Vec<TaskPomodoroRecord>, active: Vec<TaskId>) -> Self {
        let mut ledger = Self::new();
        for mut record in records {
            if ledger.lookup(&record.task_id).is_some() {
                continue;
            }
            record.estimated_pomodoros = record.estimated_pomodoros.max(1);
            ledger.records.push(record);
        }
        for task_id in active {
            ledger.activate(&task_id);
        }
        ledger
    }

    /// Adds a task to tracking.
    ///
    /// Inserts a record if absent (an existing record keeps its counters) and
    /// adds the task to the active set. Returns true if anything changed.
    pub fn track(&mut self, task_id: &str, estimate: u32) -> bool {
        let inserted = if self.lookup(task_id).is_none() {
            self.records.push(TaskPomodoroRecord::new(task_id, estimate));
            true
        } else {
            false
        };
        let activated = self.activate(task_id);
        if inserted || activated {
            debug!(task_id, estimate, "Task tracked");
        }
        inserted || activated
    }

    /// Removes a task's record and active-set membership.
    pub fn untrack(&mut self, task_id: &str) -> bool {
        let before = (self.records.len(), self.active.len());
        self.records.retain(|r| r.task_id != task_id);
        self.active.retain(|id| id != task_id);
        let changed = before != (self.records.len(), self.active.len());
        if changed {
            debug!(task_id, "Task untracked");
        }
        changed
    }

    /// Updates a task's estimate, creating the record if needed.
    ///
    /// Creating a record this way does not add the task to the active set.
    pub fn set_estimate(&mut self, task_id: &str, estimate: u32) {
        let estimate = estimate.max(1);
        match self.records.iter_mut().find(|r| r.task_id == task_id) {
            Some(record) => record.estimated_pomodoros = estimate,
            None => self.records.push(TaskPomodoroRecord::new(task_id, estimate)),
        }
    }

    /// Increments a tracked task's completed counter. No-op for untracked tasks.
    pub fn increment_completed(&mut self, task_id: &str) -> bool {
        match self.records.iter_mut().find(|r| r.task_id == task_id) {
            Some(record) => {
                record.completed_pomodoros = record.completed_pomodoros.saturating_add(1);
                true
            }
            None => {
                debug!(task_id, "Ignoring completion for untracked task");
                false
            }
        }
    }

    /// Returns a task's record.
    pub fn lookup(&self, task_id: &str) -> Option<&TaskPomodoroRecord> {
        self.records.iter().find(|r| r.task_id == task_id)
    }

    /// Adds a task to the active set without touching records.
    pub fn activate(&mut self, task_id: &str) -> bool {
        if self.is_active(task_id) {
            return false;
        }
        self.active.push(task_id.to_string());
        true
    }

    /// Removes a task from the active set without touching records.
    pub fn deactivate(&mut self, task_id: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|id| id != task_id);
        before != self.active.len()
    }

    /// Returns true if the task is in the active set.
    pub fn is_active(&self, task_id: &str) -> bool {
        self.active.iter().any(|id| id == task_id)
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[TaskPomodoroRecord] {
        &self.records
    }

    /// Active task IDs in insertion order.
    pub fn active_task_ids(&self) -> &[TaskId] {
        &self.active
    }

    /// Records of active tasks, in active-set order.
    pub fn active_records(&self) -> impl Iterator<Item = &TaskPomodoroRecord> {
        self.active.iter().filter_map(|id| self.lookup(id))
    }
}
