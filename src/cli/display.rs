//! Display utilities for the focus timer CLI.
//!
//! This module provides formatted output for:
//! - Command results
//! - Error messages
//! - Status, settings and task list display

use crate::settings::Settings;
use crate::types::{IntervalKind, IpcResponse, ResponseData, TrackedTaskView};

/// Width of the status progress bar in characters.
const PROGRESS_BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the result of a timer command (start, pause, resume, reset, skip,
    /// select, session-end).
    pub fn show_command_result(response: &IpcResponse) {
        println!("* {}", response.message);

        if let Some(data) = &response.data {
            if let Some(line) = Self::remaining_line(data) {
                println!("  {}", line);
            }
            if let Some(task) = Self::task_label(data) {
                println!("  タスク: {}", task);
            }
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        println!("フォーカスタイマー ステータス");
        println!("─────────────────────────────");

        let Some(data) = &response.data else {
            println!("ステータスを取得できませんでした");
            return;
        };

        println!("状態: {}", Self::state_label(data));

        if data.state.as_deref() != Some("idle") {
            if let Some(line) = Self::remaining_line(data) {
                println!("{}", line);
            }
            if let Some(progress) = data.progress {
                println!("進捗: {}", Self::progress_bar(progress));
            }
        }
        if let Some(count) = data.completed_pomodoros {
            println!("完了ポモドーロ: {}", count);
        }
        if let Some(cycles) = data.completed_cycles {
            println!("完了サイクル: {}", cycles);
        }
        if let Some(minutes) = data.total_focus_minutes {
            println!("合計集中時間: {}分", minutes);
        }
        if let Some(task) = Self::task_label(data) {
            println!("タスク: {}", task);
        }
    }

    /// Shows the current settings.
    pub fn show_settings(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }

        let Some(settings) = response.data.as_ref().and_then(|d| d.settings) else {
            println!("設定を取得できませんでした");
            return;
        };

        for line in Self::settings_lines(&settings) {
            println!("{}", line);
        }
    }

    /// Shows the tracked tasks.
    pub fn show_tasks(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }

        let tasks = response
            .data
            .as_ref()
            .and_then(|d| d.tasks.as_deref())
            .unwrap_or_default();

        if tasks.is_empty() {
            println!("トラッキング中のタスクはありません");
            return;
        }

        for task in tasks {
            println!("{}", Self::task_line(task));
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    // ------------------------------------------------------------------------
    // Formatting helpers
    // ------------------------------------------------------------------------

    /// Formats remaining seconds as (minutes, seconds).
    fn format_time(total_seconds: u32) -> (u32, u32) {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        (minutes, seconds)
    }

    fn state_label(data: &ResponseData) -> String {
        let previous = data
            .previous_state
            .as_deref()
            .and_then(IntervalKind::from_label);

        match data.state.as_deref() {
            Some("idle") => "待機中".to_string(),
            Some("paused") => match previous {
                Some(kind) => format!("一時停止中（{}）", kind.display_name()),
                None => "一時停止中".to_string(),
            },
            Some(other) => match IntervalKind::from_label(other) {
                Some(kind) => format!("{}中", kind.display_name()),
                None => other.to_string(),
            },
            None => "不明".to_string(),
        }
    }

    fn remaining_line(data: &ResponseData) -> Option<String> {
        let remaining = data.seconds_left?;
        if data.state.as_deref() == Some("idle") {
            return None;
        }
        let (minutes, seconds) = Self::format_time(remaining);
        Some(format!("残り時間: {}:{:02}", minutes, seconds))
    }

    fn task_label(data: &ResponseData) -> Option<String> {
        let id = data.current_task_id.as_deref()?;
        Some(match data.current_task_title.as_deref() {
            Some(title) => format!("{} ({})", title, id),
            None => id.to_string(),
        })
    }

    fn progress_bar(progress: f64) -> String {
        let progress = progress.clamp(0.0, 1.0);
        let filled = (progress * PROGRESS_BAR_WIDTH as f64).round() as usize;
        format!(
            "[{}{}] {:.0}%",
            "#".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            progress * 100.0
        )
    }

    fn settings_lines(settings: &Settings) -> Vec<String> {
        vec![
            format!("集中時間: {}分", settings.focus_minutes),
            format!("短い休憩: {}分", settings.short_break_minutes),
            format!("長い休憩: {}分", settings.long_break_minutes),
            format!("長い休憩までの回数: {}", settings.cycles_before_long_break),
            format!("休憩の自動開始: {}", on_off(settings.auto_start_breaks)),
            format!("集中の自動開始: {}", on_off(settings.auto_start_focus)),
            format!("サウンド: {}", on_off(settings.sound_enabled)),
            format!("通知: {}", on_off(settings.notifications_enabled)),
        ]
    }

    fn task_line(task: &TrackedTaskView) -> String {
        let marker = if task.current { ">" } else { " " };
        let name = match &task.title {
            Some(title) => format!("{} ({})", title, task.task_id),
            None => task.task_id.clone(),
        };
        format!(
            "{} {}  {}/{} ({:.0}%)",
            marker, name, task.completed_pomodoros, task.estimated_pomodoros, task.progress_percent
        )
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "オン"
    } else {
        "オフ"
    }
}

// ============================================================================
// Tests
// ============================================================================
