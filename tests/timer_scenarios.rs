//! End-to-end timer scenarios against the library API.
//!
//! Covers the cycle rules, task crediting, side-effect delivery and
//! resuming after a restart with a file-backed store.

use std::sync::Arc;

use tokio::sync::mpsc;

use focus_timer::daemon::timer::{TimerEngine, TimerEvent};
use focus_timer::notification::{MockNotificationBackend, NotificationBackend, NotificationGateway};
use focus_timer::persistence::{keys, FileStore, MemoryStore, Persistence};
use focus_timer::settings::{Settings, SettingsPatch};
use focus_timer::sound::{MockSoundPlayer, SoundKind, SoundPlayer};
use focus_timer::tasks::{TaskCatalog, TaskInfo, TaskStatus};
use focus_timer::types::{IntervalKind, TimerState};

// ============================================================================
// Test Helpers
// ============================================================================

fn catalog() -> Arc<TaskCatalog> {
    Arc::new(TaskCatalog::from_tasks([TaskInfo::new(
        "T1",
        "Write report",
        TaskStatus::InProgress,
    )]))
}

fn engine_with(
    persistence: Persistence,
    gateway: NotificationGateway,
) -> (TimerEngine, mpsc::UnboundedReceiver<TimerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TimerEngine::new(persistence, gateway, catalog(), tx), rx)
}

fn engine() -> TimerEngine {
    engine_with(Persistence::in_memory(), NotificationGateway::disabled()).0
}

fn apply(engine: &mut TimerEngine, settings: Settings) {
    let patch = SettingsPatch {
        focus_minutes: Some(settings.focus_minutes),
        short_break_minutes: Some(settings.short_break_minutes),
        long_break_minutes: Some(settings.long_break_minutes),
        cycles_before_long_break: Some(settings.cycles_before_long_break),
        auto_start_breaks: Some(settings.auto_start_breaks),
        auto_start_focus: Some(settings.auto_start_focus),
        sound_enabled: Some(settings.sound_enabled),
        notifications_enabled: Some(settings.notifications_enabled),
    };
    engine.update_settings(&patch).unwrap();
}

fn complete_focus(engine: &mut TimerEngine) {
    engine.start_focus();
    let seconds = engine.session().seconds_left;
    engine.advance(seconds);
}

// ============================================================================
// Cycle Scenarios
// ============================================================================

mod cycle_tests {
    use super::*;

    #[test]
    fn test_four_focus_intervals_end_in_long_break() {
        let mut engine = engine();
        apply(&mut engine, Settings::default().with_auto_start(true, false));

        for expected in [
            IntervalKind::ShortBreak,
            IntervalKind::ShortBreak,
            IntervalKind::ShortBreak,
        ] {
            complete_focus(&mut engine);
            assert_eq!(engine.session().state, TimerState::Running(expected));
            assert_eq!(engine.session().completed_cycles, 0);
        }

        complete_focus(&mut engine);
        assert_eq!(
            engine.session().state,
            TimerState::Running(IntervalKind::LongBreak)
        );
        assert_eq!(engine.session().completed_cycles, 1);
        assert_eq!(engine.session().completed_pomodoros, 4);
        assert_eq!(engine.session().seconds_left, 15 * 60);
    }

    #[test]
    fn test_cycle_law_for_every_cycle_length() {
        for cycles in 1..=10 {
            let mut engine = engine();
            apply(
                &mut engine,
                Settings::default()
                    .with_focus_minutes(1)
                    .with_cycles_before_long_break(cycles)
                    .with_auto_start(true, false),
            );

            for k in 0..(2 * cycles) {
                complete_focus(&mut engine);
                let expected = if (k + 1) % cycles == 0 {
                    IntervalKind::LongBreak
                } else {
                    IntervalKind::ShortBreak
                };
                assert_eq!(
                    engine.session().state.running_kind(),
                    Some(expected),
                    "cycles={} k={}",
                    cycles,
                    k
                );
            }
        }
    }

    #[test]
    fn test_full_focus_without_auto_start_goes_idle() {
        let mut engine = engine();
        apply(&mut engine, Settings::default().with_auto_start(false, false));

        engine.start_focus();
        assert_eq!(engine.session().seconds_left, 1500);
        engine.advance(1500);

        assert_eq!(engine.session().state, TimerState::Idle);
        assert_eq!(engine.session().completed_pomodoros, 1);
        assert_eq!(engine.tick_loop(), None);
    }

    #[test]
    fn test_auto_start_focus_after_break() {
        let mut engine = engine();
        apply(&mut engine, Settings::default().with_auto_start(false, true));

        engine.start_short_break();
        engine.advance(300);

        assert_eq!(
            engine.session().state,
            TimerState::Running(IntervalKind::Focus)
        );
        assert_eq!(engine.session().seconds_left, 1500);
        assert_eq!(engine.session().completed_pomodoros, 0);
    }

    #[test]
    fn test_start_for_all_valid_focus_lengths() {
        let mut engine = engine();
        for minutes in [1, 25, 60, 120] {
            apply(&mut engine, Settings::default().with_focus_minutes(minutes));
            engine.start_focus();
            assert_eq!(engine.session().seconds_left, minutes * 60);
            assert_eq!(engine.session().target_seconds, minutes * 60);
            assert_eq!(
                engine.session().state,
                TimerState::Running(IntervalKind::Focus)
            );
        }
    }
}

// ============================================================================
// Pause / Resume Scenarios
// ============================================================================

mod pause_resume_tests {
    use super::*;

    #[test]
    fn test_pause_resume_round_trip_for_every_kind() {
        let mut engine = engine();
        for kind in [
            IntervalKind::Focus,
            IntervalKind::ShortBreak,
            IntervalKind::LongBreak,
        ] {
            engine.start(kind);
            engine.advance(7);
            let before = engine.session().clone();

            assert!(engine.pause());
            assert!(engine.resume());

            assert_eq!(engine.session(), &before);
            assert!(engine.tick_loop().is_some());
        }
    }

    #[test]
    fn test_resume_when_idle_changes_nothing() {
        let mut engine = engine();
        let before = engine.session().clone();

        assert!(!engine.resume());

        assert_eq!(engine.session(), &before);
        assert_eq!(engine.tick_loop(), None);
    }
}

// ============================================================================
// Task Scenarios
// ============================================================================

mod task_tests {
    use super::*;

    #[test]
    fn test_current_tracked_task_is_credited() {
        let mut engine = engine();
        engine.track("T1", 2);
        engine.set_current_task(Some("T1".to_string()));

        complete_focus(&mut engine);

        let record = engine.ledger().lookup("T1").unwrap();
        assert_eq!(record.completed_pomodoros, 1);
        assert_eq!(record.estimated_pomodoros, 2);
    }

    #[test]
    fn test_estimate_is_not_a_cap() {
        let mut engine = engine();
        apply(&mut engine, Settings::default().with_auto_start(false, false));
        engine.track("T1", 1);
        engine.set_current_task(Some("T1".to_string()));

        for _ in 0..3 {
            complete_focus(&mut engine);
        }

        let tasks = engine.tracked_tasks();
        assert_eq!(tasks[0].completed_pomodoros, 3);
        assert!((tasks[0].progress_percent - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_completion_event_names_credited_task() {
        let (mut engine, mut rx) =
            engine_with(Persistence::in_memory(), NotificationGateway::disabled());
        engine.track("T1", 2);
        engine.set_current_task(Some("T1".to_string()));

        complete_focus(&mut engine);

        let mut credited = None;
        while let Ok(event) = rx.try_recv() {
            if let TimerEvent::FocusCompleted { credited_task, .. } = event {
                credited = credited_task;
            }
        }
        assert_eq!(credited.as_deref(), Some("T1"));
    }
}

// ============================================================================
// Side Effect Scenarios
// ============================================================================

mod side_effect_tests {
    use super::*;

    fn mocked() -> (TimerEngine, Arc<MockSoundPlayer>, Arc<MockNotificationBackend>) {
        let sound = Arc::new(MockSoundPlayer::new());
        let backend = Arc::new(MockNotificationBackend::new());
        let gateway = NotificationGateway::new(
            Some(sound.clone() as Arc<dyn SoundPlayer>),
            Some(backend.clone() as Arc<dyn NotificationBackend>),
            &Settings::default(),
        );
        let (engine, _rx) = engine_with(Persistence::in_memory(), gateway);
        (engine, sound, backend)
    }

    #[test]
    fn test_focus_cycle_sounds_and_notification() {
        let (mut engine, sound, backend) = mocked();
        engine.set_current_task(Some("T1".to_string()));

        complete_focus(&mut engine);

        assert_eq!(
            sound.get_play_calls(),
            vec![SoundKind::Start, SoundKind::Complete, SoundKind::Break]
        );
        assert_eq!(
            backend.get_notifications(),
            vec![(
                "集中セッション完了！".to_string(),
                "タスク: Write report - お疲れさまでした！".to_string()
            )]
        );
    }

    #[test]
    fn test_break_completion_notifies() {
        let (mut engine, _sound, backend) = mocked();
        apply(&mut engine, Settings::default().with_auto_start(false, false));

        engine.start_short_break();
        engine.advance(300);

        assert_eq!(
            backend.get_notifications(),
            vec![(
                "休憩終了！".to_string(),
                "集中する準備はできましたか？".to_string()
            )]
        );
    }

    #[test]
    fn test_disabled_side_effects_are_silent() {
        let (mut engine, sound, backend) = mocked();
        apply(
            &mut engine,
            Settings {
                sound_enabled: false,
                notifications_enabled: false,
                ..Settings::default()
            },
        );

        complete_focus(&mut engine);

        assert_eq!(sound.play_count(), 0);
        assert_eq!(backend.notification_count(), 0);
    }

    #[test]
    fn test_failing_side_effects_do_not_stop_the_timer() {
        let (mut engine, sound, backend) = mocked();
        sound.set_should_fail(true);
        backend.set_should_fail(true);

        complete_focus(&mut engine);

        assert_eq!(engine.session().completed_pomodoros, 1);
        assert_eq!(
            engine.session().state,
            TimerState::Running(IntervalKind::ShortBreak)
        );
    }
}

// ============================================================================
// Restart Scenarios
// ============================================================================

mod restart_tests {
    use super::*;

    #[test]
    fn test_resume_mid_focus_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = FileStore::open(&path).unwrap();
            let (mut engine, _rx) =
                engine_with(Persistence::new(store), NotificationGateway::disabled());
            engine.track("T1", 3);
            engine.set_current_task(Some("T1".to_string()));
            engine.start_focus();
            engine.advance(600);
        }

        let store = FileStore::open(&path).unwrap();
        let (mut engine, _rx) =
            engine_with(Persistence::new(store), NotificationGateway::disabled());

        assert_eq!(
            engine.session().state,
            TimerState::Running(IntervalKind::Focus)
        );
        assert_eq!(engine.session().seconds_left, 900);
        assert!(engine.tick_loop().is_some());

        engine.advance(900);
        assert_eq!(engine.session().completed_pomodoros, 1);
        assert_eq!(engine.ledger().lookup("T1").unwrap().completed_pomodoros, 1);
    }

    #[test]
    fn test_paused_session_stays_paused_after_restart() {
        let store = MemoryStore::new();
        {
            let (mut engine, _rx) = engine_with(
                Persistence::new(store.clone()),
                NotificationGateway::disabled(),
            );
            engine.start_long_break();
            engine.advance(60);
            engine.pause();
        }

        let (engine, _rx) = engine_with(Persistence::new(store), NotificationGateway::disabled());

        assert_eq!(
            engine.session().state,
            TimerState::Paused(IntervalKind::LongBreak)
        );
        assert_eq!(engine.session().seconds_left, 840);
        assert_eq!(engine.tick_loop(), None);
    }

    #[test]
    fn test_settings_survive_restart() {
        let store = MemoryStore::new();
        {
            let (mut engine, _rx) = engine_with(
                Persistence::new(store.clone()),
                NotificationGateway::disabled(),
            );
            apply(&mut engine, Settings::default().with_focus_minutes(45));
        }

        let (engine, _rx) = engine_with(Persistence::new(store), NotificationGateway::disabled());
        assert_eq!(engine.settings().focus_minutes, 45);
    }

    #[test]
    fn test_paused_without_previous_state_restores_idle() {
        let store = MemoryStore::new();
        store.insert(keys::STATE, "\"paused\"");
        store.insert(keys::PREVIOUS_STATE, "null");
        store.insert(keys::SECONDS_LEFT, "100");
        store.insert(keys::TARGET_SECONDS, "1500");
        store.insert(keys::COMPLETED_POMODOROS, "3");

        let (mut engine, _rx) =
            engine_with(Persistence::new(store), NotificationGateway::disabled());

        assert_eq!(engine.session().state, TimerState::Idle);
        assert_eq!(engine.session().completed_pomodoros, 0);
        assert!(!engine.resume());
    }

    #[test]
    fn test_corrupt_state_file_starts_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        let (engine, _rx) = engine_with(Persistence::new(store), NotificationGateway::disabled());

        assert_eq!(engine.session().state, TimerState::Idle);
        assert_eq!(*engine.settings(), Settings::default());
    }
}
