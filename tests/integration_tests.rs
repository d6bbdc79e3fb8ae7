//! Integration tests for daemon-CLI IPC communication.
//!
//! These tests run the real request handler and timer engine behind a Unix
//! socket and drive them through `IpcClient`:
//! - Interval control round trips
//! - Settings updates and field-level rejections
//! - Task tracking and selection
//! - Connection error handling

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use focus_timer::cli::client::IpcClient;
use focus_timer::daemon::ipc::{IpcServer, RequestHandler};
use focus_timer::daemon::timer::TimerEngine;
use focus_timer::notification::NotificationGateway;
use focus_timer::persistence::{MemoryStore, Persistence};
use focus_timer::settings::SettingsPatch;
use focus_timer::tasks::{TaskCatalog, TaskInfo, TaskStatus};
use focus_timer::types::IntervalKind;

// ============================================================================
// Test Helpers
// ============================================================================

struct TestDaemon {
    _dir: tempfile::TempDir,
    socket_path: PathBuf,
    engine: Arc<Mutex<TimerEngine>>,
    server: JoinHandle<()>,
}

impl TestDaemon {
    fn client(&self) -> IpcClient {
        IpcClient::with_socket_path(self.socket_path.clone())
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn catalog() -> TaskCatalog {
    TaskCatalog::from_tasks([
        TaskInfo::new("T1", "Write report", TaskStatus::InProgress),
        TaskInfo::new("T2", "Review PR", TaskStatus::Todo),
        TaskInfo::new("T3", "Ship release", TaskStatus::Done),
    ])
}

/// Starts a server that answers every connection with the real handler.
///
/// No ticker runs, so the countdown only moves when a test advances it.
fn spawn_daemon() -> TestDaemon {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("integration_test.sock");

    let (tx, _rx) = mpsc::unbounded_channel();
    let engine = TimerEngine::new(
        Persistence::new(MemoryStore::new()),
        NotificationGateway::disabled(),
        Arc::new(catalog()),
        tx,
    );
    let engine = Arc::new(Mutex::new(engine));

    let server = IpcServer::new(&socket_path).unwrap();
    let handler = RequestHandler::new(engine.clone());
    let server = tokio::spawn(async move {
        while let Ok(stream) = server.accept().await {
            handler.handle_connection(stream).await;
        }
    });

    TestDaemon {
        _dir: dir,
        socket_path,
        engine,
        server,
    }
}

// ============================================================================
// Interval Control
// ============================================================================

mod interval_control_tests {
    use super::*;

    #[tokio::test]
    async fn test_start_focus_via_ipc() {
        let daemon = spawn_daemon();

        let response = daemon.client().start(IntervalKind::Focus).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.message, "集中を開始しました");
        let data = response.data.unwrap();
        assert_eq!(data.state.as_deref(), Some("focus"));
        assert_eq!(data.seconds_left, Some(1500));
        assert_eq!(data.target_seconds, Some(1500));
    }

    #[tokio::test]
    async fn test_pause_resume_via_ipc() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.start(IntervalKind::Focus).await.unwrap();
        daemon.engine.lock().await.advance(100);

        let paused = client.pause().await.unwrap();
        let data = paused.data.unwrap();
        assert_eq!(data.state.as_deref(), Some("paused"));
        assert_eq!(data.previous_state.as_deref(), Some("focus"));
        assert_eq!(data.seconds_left, Some(1400));

        let resumed = client.resume().await.unwrap();
        let data = resumed.data.unwrap();
        assert_eq!(data.state.as_deref(), Some("focus"));
        assert_eq!(data.previous_state, None);
        assert_eq!(data.seconds_left, Some(1400));
    }

    #[tokio::test]
    async fn test_resume_when_idle_is_a_noop() {
        let daemon = spawn_daemon();

        let response = daemon.client().resume().await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.message, "タイマーは一時停止していません");
        assert_eq!(response.data.unwrap().state.as_deref(), Some("idle"));
    }

    #[tokio::test]
    async fn test_skip_focus_goes_to_break() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.start(IntervalKind::Focus).await.unwrap();
        let response = client.skip().await.unwrap();

        assert_eq!(response.message, "短い休憩にスキップしました");
        let data = response.data.unwrap();
        assert_eq!(data.state.as_deref(), Some("shortBreak"));
        assert_eq!(data.completed_pomodoros, Some(0));
    }

    #[tokio::test]
    async fn test_status_reports_completed_focus() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client
            .update_settings(SettingsPatch {
                auto_start_breaks: Some(false),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();
        client.start(IntervalKind::Focus).await.unwrap();
        daemon.engine.lock().await.advance(1500);

        let data = client.status().await.unwrap().data.unwrap();
        assert_eq!(data.state.as_deref(), Some("idle"));
        assert_eq!(data.completed_pomodoros, Some(1));
        assert_eq!(data.total_focus_minutes, Some(25));
    }

    #[tokio::test]
    async fn test_reset_clears_cycles_keeps_pomodoros() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client
            .update_settings(SettingsPatch {
                cycles_before_long_break: Some(1),
                auto_start_breaks: Some(false),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();
        client.start(IntervalKind::Focus).await.unwrap();
        daemon.engine.lock().await.advance(1500);

        let data = client.reset().await.unwrap().data.unwrap();
        assert_eq!(data.state.as_deref(), Some("idle"));
        assert_eq!(data.completed_cycles, Some(0));
        assert_eq!(data.completed_pomodoros, Some(1));
    }

    #[tokio::test]
    async fn test_session_end_pauses_running_timer() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.start(IntervalKind::LongBreak).await.unwrap();
        let data = client.session_end().await.unwrap().data.unwrap();

        assert_eq!(data.state.as_deref(), Some("paused"));
        assert_eq!(data.previous_state.as_deref(), Some("longBreak"));
        assert!(daemon.engine.lock().await.tick_loop().is_none());
    }
}

// ============================================================================
// Settings
// ============================================================================

mod settings_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_default_settings() {
        let daemon = spawn_daemon();

        let settings = daemon
            .client()
            .settings()
            .await
            .unwrap()
            .data
            .unwrap()
            .settings
            .unwrap();

        assert_eq!(settings.focus_minutes, 25);
        assert_eq!(settings.cycles_before_long_break, 4);
    }

    #[tokio::test]
    async fn test_update_settings_applies_to_next_interval() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.start(IntervalKind::Focus).await.unwrap();
        let updated = client
            .update_settings(SettingsPatch {
                focus_minutes: Some(50),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.data.unwrap().settings.unwrap().focus_minutes, 50);

        // The running interval keeps its length
        let status = client.status().await.unwrap().data.unwrap();
        assert_eq!(status.target_seconds, Some(1500));

        let restarted = client.start(IntervalKind::Focus).await.unwrap();
        assert_eq!(restarted.data.unwrap().target_seconds, Some(3000));
    }

    #[tokio::test]
    async fn test_invalid_update_is_rejected_whole() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        let result = client
            .update_settings(SettingsPatch {
                focus_minutes: Some(0),
                short_break_minutes: Some(10),
                cycles_before_long_break: Some(11),
                ..SettingsPatch::default()
            })
            .await;

        let message = result.unwrap_err().to_string();
        assert!(message.contains("focusMinutes"), "{}", message);
        assert!(message.contains("cyclesBeforeLongBreak"), "{}", message);
        assert!(!message.contains("shortBreakMinutes"), "{}", message);

        let settings = *daemon.engine.lock().await.settings();
        assert_eq!(settings.short_break_minutes, 5);
        assert_eq!(settings.focus_minutes, 25);
    }

    #[tokio::test]
    async fn test_empty_update_is_an_error() {
        let daemon = spawn_daemon();

        let result = daemon
            .client()
            .update_settings(SettingsPatch::default())
            .await;

        assert!(result.is_err());
    }
}

// ============================================================================
// Tasks
// ============================================================================

mod task_tests {
    use super::*;

    #[tokio::test]
    async fn test_track_and_list() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.track("T1".to_string(), Some(3)).await.unwrap();
        let tasks = client.tasks().await.unwrap().data.unwrap().tasks.unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_id, "T1");
        assert_eq!(tasks[0].title.as_deref(), Some("Write report"));
        assert_eq!(tasks[0].estimated_pomodoros, 3);
        assert!(!tasks[0].current);
    }

    #[tokio::test]
    async fn test_track_rejects_finished_and_unknown_tasks() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        assert!(client.track("T3".to_string(), None).await.is_err());
        assert!(client.track("missing".to_string(), None).await.is_err());
        assert!(daemon.engine.lock().await.ledger().records().is_empty());
    }

    #[tokio::test]
    async fn test_selected_task_is_credited() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        let selected = client.select(Some("T2".to_string()), true).await.unwrap();
        let data = selected.data.unwrap();
        assert_eq!(data.current_task_id.as_deref(), Some("T2"));
        assert_eq!(data.current_task_title.as_deref(), Some("Review PR"));

        client.start(IntervalKind::Focus).await.unwrap();
        daemon.engine.lock().await.advance(1500);

        let tasks = client.tasks().await.unwrap().data.unwrap().tasks.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].completed_pomodoros, 1);
        assert!(tasks[0].current);
    }

    #[tokio::test]
    async fn test_untracked_selection_is_not_credited() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.select(Some("T1".to_string()), false).await.unwrap();
        client.start(IntervalKind::Focus).await.unwrap();
        daemon.engine.lock().await.advance(1500);

        let engine = daemon.engine.lock().await;
        assert_eq!(engine.session().completed_pomodoros, 1);
        assert!(engine.ledger().lookup("T1").is_none());
    }

    #[tokio::test]
    async fn test_estimate_and_untrack() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.track("T1".to_string(), None).await.unwrap();
        let tasks = client
            .estimate("T1".to_string(), 5)
            .await
            .unwrap()
            .data
            .unwrap()
            .tasks
            .unwrap();
        assert_eq!(tasks[0].estimated_pomodoros, 5);

        let tasks = client
            .untrack("T1".to_string())
            .await
            .unwrap()
            .data
            .unwrap()
            .tasks
            .unwrap();
        assert!(tasks.is_empty());
        assert!(daemon.engine.lock().await.ledger().lookup("T1").is_none());
    }

    #[tokio::test]
    async fn test_clear_selection() {
        let daemon = spawn_daemon();
        let client = daemon.client();

        client.select(Some("T1".to_string()), false).await.unwrap();
        let data = client.select(None, false).await.unwrap().data.unwrap();

        assert_eq!(data.current_task_id, None);
    }
}

// ============================================================================
// Connection Errors
// ============================================================================

mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_daemon_running() {
        let dir = tempfile::tempdir().unwrap();
        let client = IpcClient::with_socket_path(dir.path().join("missing.sock"));

        let result = client.status().await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Daemonに接続できません"), "{}", message);
    }

    #[tokio::test]
    async fn test_sequential_clients_share_state() {
        let daemon = spawn_daemon();

        daemon.client().start(IntervalKind::Focus).await.unwrap();
        let data = daemon.client().status().await.unwrap().data.unwrap();

        assert_eq!(data.state.as_deref(), Some("focus"));
    }
}
