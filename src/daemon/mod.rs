//! Daemon module for the focus timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and cycle logic
//! - `ticker`: One-second driver for the engine's tick loop
//! - `ipc`: Unix socket server and request dispatch

pub mod ipc;
pub mod ticker;
pub mod timer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::notification::{DesktopNotifier, NotificationBackend, NotificationGateway};
use crate::persistence::{FileStore, Persistence};
use crate::sound::{self, SoundPlayer};
use crate::tasks::TaskCatalog;

pub use ipc::{IpcServer, RequestHandler, SOCKET_FILE_NAME};
pub use timer::{TimerEngine, TimerEvent};

/// Environment variable overriding the state directory.
pub const HOME_ENV: &str = "FOCUS_TIMER_HOME";

/// State file name inside the state directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// Task catalog file name inside the state directory.
pub const TASKS_FILE_NAME: &str = "tasks.json";

/// Locations used by the daemon and the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    home: PathBuf,
}

impl DaemonConfig {
    /// Uses `home` as the state directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolves the state directory: explicit path, then `FOCUS_TIMER_HOME`,
    /// then `~/.focus-timer`.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        if let Some(home) = explicit {
            return Ok(Self::new(home));
        }
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(home));
        }
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(Self::new(home.join(".focus-timer")))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn socket_path(&self) -> PathBuf {
        self.home.join(SOCKET_FILE_NAME)
    }

    pub fn state_path(&self) -> PathBuf {
        self.home.join(STATE_FILE_NAME)
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.home.join(TASKS_FILE_NAME)
    }
}

/// Runs the daemon in the foreground until Ctrl-C.
///
/// On shutdown the running interval is paused as if the host session had
/// ended, which also flushes the final state.
///
/// # Errors
///
/// Returns an error if the state file, task catalog or socket cannot be
/// opened.
pub async fn run(config: &DaemonConfig) -> Result<()> {
    let store = FileStore::open(&config.state_path())
        .with_context(|| format!("Failed to open state file: {:?}", config.state_path()))?;
    let persistence = Persistence::new(store);

    let tasks = TaskCatalog::load(&config.tasks_path())
        .with_context(|| format!("Failed to load tasks: {:?}", config.tasks_path()))?;
    info!("Loaded {} tasks", tasks.len());

    let sound = sound::try_create_player().map(|player| player as Arc<dyn SoundPlayer>);
    let backend: Arc<dyn NotificationBackend> = Arc::new(DesktopNotifier::new());
    let snapshot = persistence.restore();
    let gateway = NotificationGateway::new(sound, Some(backend), &snapshot.settings);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine =
        TimerEngine::with_snapshot(persistence, snapshot, gateway, Arc::new(tasks), event_tx);
    let loop_rx = engine.subscribe_tick_loop();
    let engine = Arc::new(Mutex::new(engine));

    let ticker = tokio::spawn(ticker::run_ticker(engine.clone(), loop_rx));
    let logger = tokio::spawn(log_events(event_rx));

    let server = IpcServer::new(&config.socket_path())?;
    info!("Listening on {:?}", server.socket_path());
    let handler = RequestHandler::new(engine.clone());

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move { handler.handle_connection(stream).await });
                }
                Err(e) => warn!("{:#}", e),
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    engine.lock().await.on_session_end();
    ticker.abort();
    logger.abort();
    Ok(())
}

async fn log_events(mut events: mpsc::UnboundedReceiver<TimerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            TimerEvent::Tick { .. } => {}
            TimerEvent::FocusCompleted {
                completed_pomodoros,
                credited_task,
                next_break,
            } => info!(
                completed_pomodoros,
                task = credited_task.as_deref().unwrap_or("-"),
                next = next_break.as_str(),
                "Focus completed"
            ),
            other => debug!(?other, "Timer event"),
        }
    }
}
