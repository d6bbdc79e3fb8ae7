//! Timer engine for the focus timer.
//!
//! This module provides the core timer functionality:
//! - State transitions between idle, focus, breaks and paused
//! - Cycle counting and long-break selection
//! - Crediting finished focus intervals to the current task
//! - Mirroring every mutation into the persistence layer
//!
//! The engine does not own a clock. It owns a tick-loop token (a generation
//! number) published through a watch channel; the daemon's ticker keeps one
//! interval per generation and calls [`TimerEngine::tick`] with it. Ticks for
//! any other generation are ignored, so at most one loop ever drives the
//! countdown.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::ledger::TaskPomodoroLedger;
use crate::notification::NotificationGateway;
use crate::persistence::{Persistence, Snapshot};
use crate::settings::{Settings, SettingsError, SettingsPatch, SettingsStore};
use crate::tasks::TaskCollaborator;
use crate::types::{
    IntervalKind, ResponseData, TaskId, TimerSession, TimerState, TrackedTaskView,
};

// ============================================================================
// TimerEvent
// ============================================================================

/// Timer events for logging and external integrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// An interval started
    IntervalStarted {
        kind: IntervalKind,
        target_seconds: u32,
    },
    /// A focus interval ran to zero
    FocusCompleted {
        /// Total completed pomodoros after this one
        completed_pomodoros: u32,
        /// Task credited with the pomodoro (if tracked)
        credited_task: Option<TaskId>,
        /// The break chosen by the cycle count
        next_break: IntervalKind,
    },
    /// A break ran to zero
    BreakCompleted { kind: IntervalKind },
    /// Timer paused
    Paused { kind: IntervalKind, seconds_left: u32 },
    /// Timer resumed
    Resumed { kind: IntervalKind, seconds_left: u32 },
    /// Timer reset to idle
    Reset,
    /// An interval was skipped without completing
    Skipped { from: IntervalKind, to: IntervalKind },
    /// One second elapsed
    Tick { seconds_left: u32 },
    /// The host session ended
    SessionEnded,
}

// ============================================================================
// TimerEngine
// ============================================================================

/// The focus-timer state machine.
pub struct TimerEngine {
    session: TimerSession,
    settings: SettingsStore,
    ledger: TaskPomodoroLedger,
    persistence: Persistence,
    gateway: NotificationGateway,
    tasks: Arc<dyn TaskCollaborator>,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
    /// Generation of the active tick loop, if any
    tick_loop: Option<u64>,
    last_generation: u64,
    loop_tx: watch::Sender<Option<u64>>,
}

impl TimerEngine {
    /// Creates an engine from the last persisted snapshot.
    pub fn new(
        persistence: Persistence,
        gateway: NotificationGateway,
        tasks: Arc<dyn TaskCollaborator>,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let snapshot = persistence.restore();
        Self::with_snapshot(persistence, snapshot, gateway, tasks, event_tx)
    }

    /// Creates an engine from a snapshot the caller already restored.
    ///
    /// A restored running interval re-arms the tick loop, so the countdown
    /// continues where the previous process stopped.
    pub fn with_snapshot(
        persistence: Persistence,
        snapshot: Snapshot,
        gateway: NotificationGateway,
        tasks: Arc<dyn TaskCollaborator>,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let settings = SettingsStore::new(snapshot.settings).unwrap_or_else(|e| {
            warn!("Restored settings rejected, using defaults: {}", e);
            SettingsStore::default()
        });
        let (loop_tx, _) = watch::channel(None);

        let mut engine = Self {
            session: snapshot.session,
            settings,
            ledger: snapshot.ledger,
            persistence,
            gateway,
            tasks,
            event_tx,
            tick_loop: None,
            last_generation: 0,
            loop_tx,
        };

        if let Some(kind) = engine.session.state.running_kind() {
            info!(
                "Resuming {} with {}s left",
                kind.as_str(),
                engine.session.seconds_left
            );
            engine.arm_loop();
        }
        engine
    }

    // ------------------------------------------------------------------------
    // Interval control
    // ------------------------------------------------------------------------

    /// Starts an interval of the given kind from any state.
    ///
    /// A running interval is discarded without credit.
    pub fn start(&mut self, kind: IntervalKind) {
        self.begin_interval(kind);
        self.persist();
    }

    pub fn start_focus(&mut self) {
        self.start(IntervalKind::Focus);
    }

    pub fn start_short_break(&mut self) {
        self.start(IntervalKind::ShortBreak);
    }

    pub fn start_long_break(&mut self) {
        self.start(IntervalKind::LongBreak);
    }

    /// Advances the countdown by one second.
    ///
    /// Returns false if `generation` is not the active tick loop.
    pub fn tick(&mut self, generation: u64) -> bool {
        if self.tick_loop != Some(generation) {
            debug!(generation, "Ignoring tick from a stale loop");
            return false;
        }
        let Some(kind) = self.session.state.running_kind() else {
            self.cancel_loop();
            return false;
        };

        self.session.seconds_left = self.session.seconds_left.saturating_sub(1);
        self.emit(TimerEvent::Tick {
            seconds_left: self.session.seconds_left,
        });

        if self.session.seconds_left == 0 {
            self.cancel_loop();
            self.complete(kind);
        }
        self.persist();
        true
    }

    /// Runs `ticks` ticks on whatever loop is active at each step.
    ///
    /// Stops early once no loop is active.
    pub fn advance(&mut self, ticks: u32) {
        for _ in 0..ticks {
            let Some(generation) = self.tick_loop else {
                break;
            };
            self.tick(generation);
        }
    }

    /// Pauses a running interval. No-op otherwise.
    pub fn pause(&mut self) -> bool {
        let TimerState::Running(kind) = self.session.state else {
            debug!(state = self.session.state.as_str(), "Pause ignored");
            return false;
        };

        self.cancel_loop();
        self.session.state = TimerState::Paused(kind);
        self.emit(TimerEvent::Paused {
            kind,
            seconds_left: self.session.seconds_left,
        });
        self.persist();
        true
    }

    /// Resumes a paused interval with its preserved remaining time.
    /// No-op otherwise.
    pub fn resume(&mut self) -> bool {
        let TimerState::Paused(kind) = self.session.state else {
            debug!(state = self.session.state.as_str(), "Resume ignored");
            return false;
        };

        self.session.state = TimerState::Running(kind);
        self.arm_loop();
        self.emit(TimerEvent::Resumed {
            kind,
            seconds_left: self.session.seconds_left,
        });
        self.persist();
        true
    }

    /// Returns to idle and clears the cycle count.
    ///
    /// Completed pomodoros and the ledger are kept.
    pub fn reset(&mut self) {
        self.cancel_loop();
        self.session.state = TimerState::Idle;
        self.session.seconds_left = 0;
        self.session.target_seconds = 0;
        self.session.completed_cycles = 0;
        self.emit(TimerEvent::Reset);
        self.persist();
    }

    /// Jumps to the next interval without crediting the current one.
    ///
    /// Returns the interval that was started, or None when idle or paused.
    pub fn skip(&mut self) -> Option<IntervalKind> {
        let Some(from) = self.session.state.running_kind() else {
            debug!(state = self.session.state.as_str(), "Skip ignored");
            return None;
        };

        let to = match from {
            IntervalKind::Focus => {
                self.break_after(self.session.completed_cycles.saturating_add(1))
            }
            IntervalKind::ShortBreak | IntervalKind::LongBreak => IntervalKind::Focus,
        };
        self.emit(TimerEvent::Skipped { from, to });
        self.begin_interval(to);
        self.persist();
        Some(to)
    }

    /// Pauses a running interval because the host session ended.
    pub fn on_session_end(&mut self) {
        if self.session.state.is_active() {
            info!("Session ended, pausing timer");
            self.pause();
        }
        self.emit(TimerEvent::SessionEnded);
    }

    // ------------------------------------------------------------------------
    // Tasks and settings
    // ------------------------------------------------------------------------

    /// Sets or clears the current task. Does not track it.
    pub fn set_current_task(&mut self, task_id: Option<TaskId>) {
        self.session.current_task_id = task_id;
        self.persist();
    }

    /// Adds a task to tracking.
    pub fn track(&mut self, task_id: &str, estimate: u32) -> bool {
        let changed = self.ledger.track(task_id, estimate);
        if changed {
            self.persist();
        }
        changed
    }

    /// Removes a task from tracking.
    pub fn untrack(&mut self, task_id: &str) -> bool {
        let changed = self.ledger.untrack(task_id);
        if changed {
            self.persist();
        }
        changed
    }

    /// Changes a task's estimate.
    pub fn set_estimate(&mut self, task_id: &str, estimate: u32) {
        self.ledger.set_estimate(task_id, estimate);
        self.persist();
    }

    /// Returns true if the task exists and is not finished.
    pub fn is_trackable(&self, task_id: &str) -> bool {
        self.tasks.is_trackable(task_id)
    }

    /// Applies a partial settings update.
    ///
    /// A running interval keeps its length; new values apply from the next
    /// interval on.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Invalid` and changes nothing if any field is
    /// out of bounds.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Settings, SettingsError> {
        let change = self.settings.update(patch)?;
        self.gateway.on_settings_changed(&change);
        self.persist();
        Ok(change.current)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        self.settings.current()
    }

    pub fn ledger(&self) -> &TaskPomodoroLedger {
        &self.ledger
    }

    /// Generation of the active tick loop.
    pub fn tick_loop(&self) -> Option<u64> {
        self.tick_loop
    }

    /// Watches the active tick loop generation.
    pub fn subscribe_tick_loop(&self) -> watch::Receiver<Option<u64>> {
        self.loop_tx.subscribe()
    }

    /// Minutes spent in completed focus intervals, at the current length.
    pub fn total_focus_minutes(&self) -> u32 {
        self.session
            .completed_pomodoros
            .saturating_mul(self.settings().focus_minutes)
    }

    /// Title of the current task, if the task backend knows it.
    pub fn current_task_title(&self) -> Option<String> {
        let task_id = self.session.current_task_id.as_deref()?;
        self.tasks.get_task(task_id).map(|task| task.title)
    }

    /// Snapshot for status responses.
    pub fn status(&self) -> ResponseData {
        ResponseData::from_session(&self.session, self.settings(), self.current_task_title())
    }

    /// Active tracked tasks with titles.
    pub fn tracked_tasks(&self) -> Vec<TrackedTaskView> {
        let current = self.session.current_task_id.as_deref();
        self.ledger
            .active_records()
            .map(|record| {
                let title = self.tasks.get_task(&record.task_id).map(|task| task.title);
                TrackedTaskView::from_record(record, title, current == Some(record.task_id.as_str()))
            })
            .collect()
    }

    /// Returns a mutable reference to the session (for testing).
    #[cfg(test)]
    pub fn session_mut(&mut self) -> &mut TimerSession {
        &mut self.session
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn begin_interval(&mut self, kind: IntervalKind) {
        self.cancel_loop();

        let target = self.settings().seconds_for(kind);
        self.session.state = TimerState::Running(kind);
        self.session.target_seconds = target;
        self.session.seconds_left = target;
        self.arm_loop();

        let settings = *self.settings();
        if kind.is_break() {
            self.gateway.break_started(&settings);
        } else {
            self.gateway.focus_started(&settings);
        }
        debug!(kind = kind.as_str(), seconds = target, "Interval started");
        self.emit(TimerEvent::IntervalStarted {
            kind,
            target_seconds: target,
        });
    }

    fn complete(&mut self, kind: IntervalKind) {
        let settings = *self.settings();

        if kind == IntervalKind::Focus {
            let finished = self.session.completed_pomodoros.saturating_add(1);
            self.session.completed_pomodoros = finished;

            let credited_task = match self.session.current_task_id.clone() {
                Some(task_id) if self.ledger.increment_completed(&task_id) => Some(task_id),
                _ => None,
            };

            let next_break = self.break_after(finished);
            if next_break == IntervalKind::LongBreak {
                self.session.completed_cycles = self.session.completed_cycles.saturating_add(1);
            }

            let title = self.current_task_title();
            self.gateway.focus_completed(&settings, title.as_deref());
            info!(
                "Focus interval completed ({} total), next: {}",
                self.session.completed_pomodoros,
                next_break.as_str()
            );
            self.emit(TimerEvent::FocusCompleted {
                completed_pomodoros: self.session.completed_pomodoros,
                credited_task,
                next_break,
            });

            if settings.auto_start_breaks {
                self.begin_interval(next_break);
            } else {
                self.go_idle();
            }
        } else {
            self.gateway.break_completed(&settings);
            info!("{} completed", kind.as_str());
            self.emit(TimerEvent::BreakCompleted { kind });

            if settings.auto_start_focus {
                self.begin_interval(IntervalKind::Focus);
            } else {
                self.go_idle();
            }
        }
    }

    /// The break that follows when the cycle counter reaches `count`.
    fn break_after(&self, count: u32) -> IntervalKind {
        if count % self.settings().cycles_before_long_break == 0 {
            IntervalKind::LongBreak
        } else {
            IntervalKind::ShortBreak
        }
    }

    fn go_idle(&mut self) {
        self.session.state = TimerState::Idle;
        self.session.seconds_left = 0;
        self.session.target_seconds = 0;
    }

    fn arm_loop(&mut self) {
        self.last_generation += 1;
        self.tick_loop = Some(self.last_generation);
        self.loop_tx.send_replace(self.tick_loop);
    }

    fn cancel_loop(&mut self) {
        if self.tick_loop.take().is_some() {
            self.loop_tx.send_replace(None);
        }
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("No timer event listener");
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self
            .persistence
            .save(self.settings.current(), &self.session, &self.ledger)
        {
            warn!("Failed to persist timer state: {}", e);
        }
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("session", &self.session)
            .field("settings", self.settings.current())
            .field("tick_loop", &self.tick_loop)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
