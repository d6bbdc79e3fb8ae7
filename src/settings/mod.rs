//! Timer settings and their validation.
//!
//! Settings are only ever replaced through [`SettingsStore::update`], which
//! merges a partial update over the current values and rejects the whole
//! update if any field is out of bounds.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::IntervalKind;

/// Allowed focus interval length in minutes.
pub const FOCUS_MINUTES_RANGE: RangeInclusive<u32> = 1..=120;
/// Allowed short break length in minutes.
pub const SHORT_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=30;
/// Allowed long break length in minutes.
pub const LONG_BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
/// Allowed number of focus intervals before a long break.
pub const CYCLES_RANGE: RangeInclusive<u32> = 1..=10;

// ============================================================================
// Settings
// ============================================================================

/// Validated timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Focus duration in minutes (1-120)
    pub focus_minutes: u32,
    /// Short break duration in minutes (1-30)
    pub short_break_minutes: u32,
    /// Long break duration in minutes (1-60)
    pub long_break_minutes: u32,
    /// Focus intervals per cycle (1-10)
    pub cycles_before_long_break: u32,
    /// Start the chosen break automatically after a focus interval
    pub auto_start_breaks: bool,
    /// Start a focus interval automatically after a break
    pub auto_start_focus: bool,
    /// Play sounds on transitions
    pub sound_enabled: bool,
    /// Show system notifications on completion
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            cycles_before_long_break: 4,
            auto_start_breaks: true,
            auto_start_focus: true,
            sound_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    /// Returns a copy with the specified focus duration.
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes;
        self
    }

    /// Returns a copy with the specified cycle length.
    pub fn with_cycles_before_long_break(mut self, cycles: u32) -> Self {
        self.cycles_before_long_break = cycles;
        self
    }

    /// Returns a copy with both auto-start flags set.
    pub fn with_auto_start(mut self, breaks: bool, focus: bool) -> Self {
        self.auto_start_breaks = breaks;
        self.auto_start_focus = focus;
        self
    }

    /// Returns the configured length of an interval in seconds.
    pub fn seconds_for(&self, kind: IntervalKind) -> u32 {
        let minutes = match kind {
            IntervalKind::Focus => self.focus_minutes,
            IntervalKind::ShortBreak => self.short_break_minutes,
            IntervalKind::LongBreak => self.long_break_minutes,
        };
        minutes * 60
    }

    /// Validates every bounded field.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` listing every offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut errors = Vec::new();

        check_range(
            &mut errors,
            "focusMinutes",
            self.focus_minutes,
            &FOCUS_MINUTES_RANGE,
            "集中時間",
            "分",
        );
        check_range(
            &mut errors,
            "shortBreakMinutes",
            self.short_break_minutes,
            &SHORT_BREAK_MINUTES_RANGE,
            "短い休憩時間",
            "分",
        );
        check_range(
            &mut errors,
            "longBreakMinutes",
            self.long_break_minutes,
            &LONG_BREAK_MINUTES_RANGE,
            "長い休憩時間",
            "分",
        );
        check_range(
            &mut errors,
            "cyclesBeforeLongBreak",
            self.cycles_before_long_break,
            &CYCLES_RANGE,
            "長い休憩までのサイクル数",
            "回",
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(errors))
        }
    }
}

fn check_range(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: u32,
    range: &RangeInclusive<u32>,
    label: &str,
    unit: &str,
) {
    if !range.contains(&value) {
        errors.push(FieldError::new(
            field,
            format!(
                "{}は{}-{}{}の範囲で指定してください（指定値: {}）",
                label,
                range.start(),
                range.end(),
                unit,
                value
            ),
        ));
    }
}

// ============================================================================
// SettingsPatch
// ============================================================================

/// A partial settings update. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles_before_long_break: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_breaks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_focus: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
}

impl SettingsPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the patch over `base` without validating.
    pub fn apply_to(&self, base: &Settings) -> Settings {
        Settings {
            focus_minutes: self.focus_minutes.unwrap_or(base.focus_minutes),
            short_break_minutes: self.short_break_minutes.unwrap_or(base.short_break_minutes),
            long_break_minutes: self.long_break_minutes.unwrap_or(base.long_break_minutes),
            cycles_before_long_break: self
                .cycles_before_long_break
                .unwrap_or(base.cycles_before_long_break),
            auto_start_breaks: self.auto_start_breaks.unwrap_or(base.auto_start_breaks),
            auto_start_focus: self.auto_start_focus.unwrap_or(base.auto_start_focus),
            sound_enabled: self.sound_enabled.unwrap_or(base.sound_enabled),
            notifications_enabled: self
                .notifications_enabled
                .unwrap_or(base.notifications_enabled),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A single rejected settings field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as exposed to clients (camelCase)
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur when updating settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// One or more fields are out of bounds.
    #[error("設定値が不正です: {}", join_fields(.0))]
    Invalid(Vec<FieldError>),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SettingsError {
    /// Returns the rejected fields.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Invalid(errors) => errors,
        }
    }

    /// Returns true if the given field was rejected.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.field_errors().iter().any(|e| e.field == field)
    }
}

// ============================================================================
// SettingsStore
// ============================================================================

/// The result of a successful settings update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsChange {
    pub previous: Settings,
    pub current: Settings,
}

impl SettingsChange {
    /// Returns true if the update turned notifications on.
    pub fn enabled_notifications(&self) -> bool {
        !self.previous.notifications_enabled && self.current.notifications_enabled
    }
}

/// Holds the validated settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    current: Settings,
}

impl SettingsStore {
    /// Creates a store from already validated settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `settings` is out of bounds.
    pub fn new(settings: Settings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self { current: settings })
    }

    /// Returns the current settings.
    pub fn current(&self) -> &Settings {
        &self.current
    }

    /// Merges `patch` over the current settings.
    ///
    /// The update is atomic: on failure the stored settings are untouched.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` listing every offending field.
    pub fn update(&mut self, patch: &SettingsPatch) -> Result<SettingsChange, SettingsError> {
        let candidate = patch.apply_to(&self.current);
        candidate.validate()?;

        let previous = std::mem::replace(&mut self.current, candidate);
        Ok(SettingsChange {
            previous,
            current: candidate,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
