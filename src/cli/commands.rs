//! Command definitions for the focus timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::settings::SettingsPatch;
use crate::types::{IntervalKind, TaskId};

/// Maximum length of a task ID accepted on the command line.
const MAX_TASK_ID_LENGTH: usize = 100;

// ============================================================================
// CLI Structure
// ============================================================================

/// Focus timer CLI
#[derive(Parser, Debug)]
#[command(
    name = "focus-timer",
    version,
    about = "タスク連動ポモドーロタイマー",
    long_about = "集中と休憩のサイクルを管理するポモドーロタイマー。\n\
                  デーモンがタイマーを保持し、再起動後もセッションを再開します。\n\
                  タスクごとに完了したポモドーロ数を記録できます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// State directory (socket, state file, task catalog) [env: FOCUS_TIMER_HOME]
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a focus interval or a break
    Start(StartArgs),

    /// Pause the running interval
    Pause,

    /// Resume the paused interval
    Resume,

    /// Stop the timer and reset the cycle count
    Reset,

    /// Skip to the next interval without completing this one
    Skip,

    /// Show current timer status
    Status,

    /// Show or change timer settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },

    /// Manage per-task pomodoro tracking
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },

    /// Notify the daemon that the user session ended (pauses the timer)
    SessionEnd,

    /// Run the daemon in the foreground
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Start Command Arguments
// ============================================================================

/// Interval kinds accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalArg {
    Focus,
    ShortBreak,
    LongBreak,
}

impl From<IntervalArg> for IntervalKind {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::Focus => IntervalKind::Focus,
            IntervalArg::ShortBreak => IntervalKind::ShortBreak,
            IntervalArg::LongBreak => IntervalKind::LongBreak,
        }
    }
}

/// Arguments for the start command
#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Interval to start
    #[arg(value_enum, default_value_t = IntervalArg::Focus)]
    pub kind: IntervalArg,
}

// ============================================================================
// Settings Subcommands
// ============================================================================

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Show current settings
    Show,
    /// Change one or more settings
    Set(SettingsArgs),
}

/// Fields for `settings set`; omitted fields keep their value.
///
/// Bounds are checked by the daemon so that every invalid field is reported
/// at once.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Focus duration in minutes (1-120)
    #[arg(long, value_name = "MIN")]
    pub focus: Option<u32>,

    /// Short break duration in minutes (1-30)
    #[arg(long, value_name = "MIN")]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-60)
    #[arg(long, value_name = "MIN")]
    pub long_break: Option<u32>,

    /// Focus intervals before a long break (1-10)
    #[arg(long, value_name = "N")]
    pub cycles: Option<u32>,

    /// Start breaks automatically
    #[arg(long, value_name = "BOOL")]
    pub auto_start_breaks: Option<bool>,

    /// Start focus automatically after a break
    #[arg(long, value_name = "BOOL")]
    pub auto_start_focus: Option<bool>,

    /// Play sounds
    #[arg(long, value_name = "BOOL")]
    pub sound: Option<bool>,

    /// Show desktop notifications
    #[arg(long, value_name = "BOOL")]
    pub notifications: Option<bool>,
}

impl SettingsArgs {
    /// Converts the flags into a partial update.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            focus_minutes: self.focus,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            cycles_before_long_break: self.cycles,
            auto_start_breaks: self.auto_start_breaks,
            auto_start_focus: self.auto_start_focus,
            sound_enabled: self.sound,
            notifications_enabled: self.notifications,
        }
    }
}

// ============================================================================
// Task Subcommands
// ============================================================================

/// Task subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task to pomodoro tracking
    Track {
        /// Task ID
        #[arg(value_parser = validate_task_id)]
        task_id: TaskId,
        /// Estimated pomodoros
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        estimate: Option<u32>,
    },

    /// Remove a task from tracking
    Untrack {
        /// Task ID
        #[arg(value_parser = validate_task_id)]
        task_id: TaskId,
    },

    /// Change the estimated pomodoros of a task
    Estimate {
        /// Task ID
        #[arg(value_parser = validate_task_id)]
        task_id: TaskId,
        /// Estimated pomodoros
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        estimate: u32,
    },

    /// Make a task the current task
    Select {
        /// Task ID
        #[arg(value_parser = validate_task_id)]
        task_id: TaskId,
        /// Also add the task to tracking
        #[arg(short, long)]
        track: bool,
    },

    /// Clear the current task
    Clear,

    /// List tracked tasks
    List,
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates a task ID.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_task_id(s: &str) -> Result<TaskId, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("タスクIDは空にできません".to_string());
    }
    if trimmed.chars().count() > MAX_TASK_ID_LENGTH {
        return Err(format!(
            "タスクIDは{}文字以内にしてください",
            MAX_TASK_ID_LENGTH
        ));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Tests
// ============================================================================
