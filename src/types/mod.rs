//! Core data types for the focus timer.
//!
//! This module defines the data structures used for:
//! - Timer state (closed variant type, no free-form labels)
//! - The singleton `TimerSession` aggregate
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};

use crate::ledger::TaskPomodoroRecord;
use crate::settings::{FieldError, Settings, SettingsPatch};

/// Identifier of a task owned by the task collaborator.
pub type TaskId = String;

// ============================================================================
// IntervalKind
// ============================================================================

/// The kind of a timed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntervalKind {
    /// Focused work interval
    Focus,
    /// Short rest interval
    ShortBreak,
    /// Long rest interval (after a full cycle)
    LongBreak,
}

impl IntervalKind {
    /// Returns the persisted label of the interval kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalKind::Focus => "focus",
            IntervalKind::ShortBreak => "shortBreak",
            IntervalKind::LongBreak => "longBreak",
        }
    }

    /// Parses a persisted label. Returns `None` for anything that is not a running kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "focus" => Some(IntervalKind::Focus),
            "shortBreak" => Some(IntervalKind::ShortBreak),
            "longBreak" => Some(IntervalKind::LongBreak),
            _ => None,
        }
    }

    /// Returns true for short and long breaks.
    pub fn is_break(&self) -> bool {
        matches!(self, IntervalKind::ShortBreak | IntervalKind::LongBreak)
    }

    /// Human readable name used in CLI output and notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            IntervalKind::Focus => "集中",
            IntervalKind::ShortBreak => "短い休憩",
            IntervalKind::LongBreak => "長い休憩",
        }
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// Represents the current state of the timer.
///
/// The interval that was running when the timer got paused travels inside
/// `Paused`, so a paused timer always knows which state to resume into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    /// No interval exists
    #[default]
    Idle,
    /// An interval is counting down
    Running(IntervalKind),
    /// A running interval was suspended
    Paused(IntervalKind),
}

impl TimerState {
    /// Returns the persisted label of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running(kind) => kind.as_str(),
            TimerState::Paused(_) => "paused",
        }
    }

    /// Rebuilds a state from its persisted `state` and `previousState` labels.
    ///
    /// Returns `None` when the pair does not describe a valid state, e.g. a
    /// `paused` label without a running previous state.
    pub fn from_labels(state: &str, previous: Option<&str>) -> Option<Self> {
        match state {
            "idle" => previous.is_none().then_some(TimerState::Idle),
            "paused" => previous
                .and_then(IntervalKind::from_label)
                .map(TimerState::Paused),
            other => {
                let kind = IntervalKind::from_label(other)?;
                previous.is_none().then_some(TimerState::Running(kind))
            }
        }
    }

    /// Returns the running kind captured at pause time. Defined only while paused.
    pub fn previous_state(&self) -> Option<IntervalKind> {
        match self {
            TimerState::Paused(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns the kind currently counting down, if any.
    pub fn running_kind(&self) -> Option<IntervalKind> {
        match self {
            TimerState::Running(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns true if the timer is actively counting down.
    pub fn is_active(&self) -> bool {
        matches!(self, TimerState::Running(_))
    }

    /// Returns true if the timer is paused.
    pub fn is_paused(&self) -> bool {
        matches!(self, TimerState::Paused(_))
    }

    /// Returns true if no interval exists.
    pub fn is_idle(&self) -> bool {
        matches!(self, TimerState::Idle)
    }
}

// ============================================================================
// TimerSession
// ============================================================================

/// The singleton session aggregate owned by the timer engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerSession {
    /// Current state
    pub state: TimerState,
    /// Remaining seconds of the current interval
    pub seconds_left: u32,
    /// Full length of the current interval in seconds
    pub target_seconds: u32,
    /// Finished focus intervals since the counter was created
    pub completed_pomodoros: u32,
    /// Number of times the long break threshold was reached
    pub completed_cycles: u32,
    /// Task associated with the session (lookup only)
    pub current_task_id: Option<TaskId>,
}

impl TimerSession {
    /// Returns the elapsed fraction of the current interval in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.target_seconds == 0 {
            return 0.0;
        }
        1.0 - f64::from(self.seconds_left) / f64::from(self.target_seconds)
    }

    /// Returns true if the session satisfies its structural invariants.
    ///
    /// `seconds_left <= target_seconds`, and `target_seconds == 0` exactly when idle.
    pub fn is_consistent(&self) -> bool {
        self.seconds_left <= self.target_seconds
            && (self.target_seconds == 0) == self.state.is_idle()
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum IpcRequest {
    /// Start a new interval of the given kind
    Start {
        /// Interval kind
        kind: IntervalKind,
    },
    /// Pause the running interval
    Pause,
    /// Resume the paused interval
    Resume,
    /// Reset the timer to idle
    Reset,
    /// Skip to the next interval
    Skip,
    /// Query the current status
    Status,
    /// Read the current settings
    Settings,
    /// Apply a partial settings update
    UpdateSettings {
        /// Fields to change
        #[serde(flatten)]
        patch: SettingsPatch,
    },
    /// Add a task to pomodoro tracking
    Track {
        /// Task identifier
        #[serde(rename = "taskId")]
        task_id: TaskId,
        /// Estimated pomodoros (defaults to 1)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimate: Option<u32>,
    },
    /// Remove a task from pomodoro tracking
    Untrack {
        /// Task identifier
        #[serde(rename = "taskId")]
        task_id: TaskId,
    },
    /// Change the estimate of a task
    Estimate {
        /// Task identifier
        #[serde(rename = "taskId")]
        task_id: TaskId,
        /// Estimated pomodoros
        estimate: u32,
    },
    /// Select the current task (or clear it)
    Select {
        /// Task identifier, `None` clears the selection
        #[serde(rename = "taskId", default)]
        task_id: Option<TaskId>,
        /// Also add the task to tracking
        #[serde(default)]
        track: bool,
    },
    /// List tracked tasks
    Tasks,
    /// The host session ended (e.g. logout)
    SessionEnd,
}

/// A tracked task as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTaskView {
    /// Task identifier
    pub task_id: TaskId,
    /// Task title, if the task collaborator knows the task
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Estimated pomodoros
    pub estimated_pomodoros: u32,
    /// Completed pomodoros
    pub completed_pomodoros: u32,
    /// Completion percentage (may exceed 100)
    pub progress_percent: f64,
    /// Whether this is the current task
    pub current: bool,
}

impl TrackedTaskView {
    /// Creates a view from a ledger record.
    pub fn from_record(record: &TaskPomodoroRecord, title: Option<String>, current: bool) -> Self {
        Self {
            task_id: record.task_id.clone(),
            title,
            estimated_pomodoros: record.estimated_pomodoros,
            completed_pomodoros: record.completed_pomodoros,
            progress_percent: record.progress_percent(),
            current,
        }
    }
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    /// Current state label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Running state captured at pause time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<String>,
    /// Remaining seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_left: Option<u32>,
    /// Interval length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_seconds: Option<u32>,
    /// Elapsed fraction of the interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Completed focus intervals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_pomodoros: Option<u32>,
    /// Completed cycles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_cycles: Option<u32>,
    /// Total focused minutes (completed pomodoros * focus minutes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_focus_minutes: Option<u32>,
    /// Current task identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<TaskId>,
    /// Current task title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task_title: Option<String>,
    /// Current settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    /// Tracked tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TrackedTaskView>>,
}

impl ResponseData {
    /// Creates response data from the timer session.
    pub fn from_session(
        session: &TimerSession,
        settings: &Settings,
        current_task_title: Option<String>,
    ) -> Self {
        Self {
            state: Some(session.state.as_str().to_string()),
            previous_state: session
                .state
                .previous_state()
                .map(|kind| kind.as_str().to_string()),
            seconds_left: Some(session.seconds_left),
            target_seconds: Some(session.target_seconds),
            progress: Some(session.progress()),
            completed_pomodoros: Some(session.completed_pomodoros),
            completed_cycles: Some(session.completed_cycles),
            total_focus_minutes: Some(
                session
                    .completed_pomodoros
                    .saturating_mul(settings.focus_minutes),
            ),
            current_task_id: session.current_task_id.clone(),
            current_task_title,
            settings: None,
            tasks: None,
        }
    }

    /// Creates response data carrying only settings.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    /// Creates response data carrying only tracked tasks.
    pub fn from_tasks(tasks: Vec<TrackedTaskView>) -> Self {
        Self {
            tasks: Some(tasks),
            ..Self::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    /// Field-level validation errors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
            errors: Vec::new(),
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
            errors: Vec::new(),
        }
    }

    /// Creates an error response carrying field-level validation errors.
    pub fn validation_error(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            errors,
            ..Self::error(message)
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
