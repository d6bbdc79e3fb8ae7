//! IPC server for the focus timer.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer, settings and task commands
//! - Serialized access to the single TimerEngine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::ledger::DEFAULT_ESTIMATE;
use crate::settings::SettingsPatch;
use crate::types::{IntervalKind, IpcRequest, IpcResponse, ResponseData, TaskId};

use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Socket file name inside the state directory
pub const SOCKET_FILE_NAME: &str = "focus-timer.sock";

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        // Clean up socket file on drop
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to TimerEngine.
#[derive(Clone)]
pub struct RequestHandler {
    /// Shared reference to the timer engine
    engine: Arc<Mutex<TimerEngine>>,
}

impl RequestHandler {
    /// Creates a new request handler with the given timer engine.
    pub fn new(engine: Arc<Mutex<TimerEngine>>) -> Self {
        Self { engine }
    }

    /// Serves one request on `stream`.
    pub async fn handle_connection(&self, mut stream: UnixStream) {
        let response = match IpcServer::receive_request(&mut stream).await {
            Ok(request) => {
                debug!(?request, "Received request");
                self.handle(request).await
            }
            Err(e) => {
                warn!("Invalid request: {:#}", e);
                IpcResponse::error(format!("不正なリクエストです: {}", e))
            }
        };

        if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
            warn!("Failed to send response: {:#}", e);
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start { kind } => self.handle_start(kind).await,
            IpcRequest::Pause => self.handle_pause().await,
            IpcRequest::Resume => self.handle_resume().await,
            IpcRequest::Reset => self.handle_reset().await,
            IpcRequest::Skip => self.handle_skip().await,
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::Settings => self.handle_settings().await,
            IpcRequest::UpdateSettings { patch } => self.handle_update_settings(patch).await,
            IpcRequest::Track { task_id, estimate } => self.handle_track(task_id, estimate).await,
            IpcRequest::Untrack { task_id } => self.handle_untrack(task_id).await,
            IpcRequest::Estimate { task_id, estimate } => {
                self.handle_estimate(task_id, estimate).await
            }
            IpcRequest::Select { task_id, track } => self.handle_select(task_id, track).await,
            IpcRequest::Tasks => self.handle_tasks().await,
            IpcRequest::SessionEnd => self.handle_session_end().await,
        }
    }

    async fn handle_start(&self, kind: IntervalKind) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.start(kind);
        IpcResponse::success(
            format!("{}を開始しました", kind.display_name()),
            Some(engine.status()),
        )
    }

    async fn handle_pause(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.pause() {
            "タイマーを一時停止しました"
        } else {
            "タイマーは実行されていません"
        };
        IpcResponse::success(message, Some(engine.status()))
    }

    async fn handle_resume(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.resume() {
            "タイマーを再開しました"
        } else {
            "タイマーは一時停止していません"
        };
        IpcResponse::success(message, Some(engine.status()))
    }

    async fn handle_reset(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        engine.reset();
        IpcResponse::success("タイマーをリセットしました", Some(engine.status()))
    }

    async fn handle_skip(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = match engine.skip() {
            Some(kind) => format!("{}にスキップしました", kind.display_name()),
            None => "スキップできるタイマーはありません".to_string(),
        };
        IpcResponse::success(message, Some(engine.status()))
    }

    async fn handle_status(&self) -> IpcResponse {
        let engine = self.engine.lock().await;
        IpcResponse::success("", Some(engine.status()))
    }

    async fn handle_settings(&self) -> IpcResponse {
        let engine = self.engine.lock().await;
        IpcResponse::success("", Some(ResponseData::from_settings(*engine.settings())))
    }

    async fn handle_update_settings(&self, patch: SettingsPatch) -> IpcResponse {
        if patch.is_empty() {
            return IpcResponse::error("変更する設定が指定されていません");
        }

        let mut engine = self.engine.lock().await;
        match engine.update_settings(&patch) {
            Ok(settings) => IpcResponse::success(
                "設定を更新しました",
                Some(ResponseData::from_settings(settings)),
            ),
            Err(e) => IpcResponse::validation_error(e.to_string(), e.field_errors().to_vec()),
        }
    }

    async fn handle_track(&self, task_id: TaskId, estimate: Option<u32>) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        if !engine.is_trackable(&task_id) {
            return untrackable(&task_id);
        }
        if estimate == Some(0) {
            return invalid_estimate();
        }

        let message = if engine.track(&task_id, estimate.unwrap_or(DEFAULT_ESTIMATE)) {
            "タスクをトラッキングに追加しました"
        } else {
            "タスクは既にトラッキング中です"
        };
        IpcResponse::success(message, Some(ResponseData::from_tasks(engine.tracked_tasks())))
    }

    async fn handle_untrack(&self, task_id: TaskId) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let message = if engine.untrack(&task_id) {
            "タスクをトラッキングから外しました"
        } else {
            "トラッキングされていないタスクです"
        };
        IpcResponse::success(message, Some(ResponseData::from_tasks(engine.tracked_tasks())))
    }

    async fn handle_estimate(&self, task_id: TaskId, estimate: u32) -> IpcResponse {
        if estimate == 0 {
            return invalid_estimate();
        }

        let mut engine = self.engine.lock().await;
        engine.set_estimate(&task_id, estimate);
        IpcResponse::success(
            format!("見積もりを{}ポモドーロに更新しました", estimate),
            Some(ResponseData::from_tasks(engine.tracked_tasks())),
        )
    }

    async fn handle_select(&self, task_id: Option<TaskId>, track: bool) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        let Some(task_id) = task_id else {
            engine.set_current_task(None);
            return IpcResponse::success("現在のタスクを解除しました", Some(engine.status()));
        };

        if track {
            if !engine.is_trackable(&task_id) {
                return untrackable(&task_id);
            }
            engine.track(&task_id, DEFAULT_ESTIMATE);
        }
        engine.set_current_task(Some(task_id));
        IpcResponse::success("現在のタスクを設定しました", Some(engine.status()))
    }

    async fn handle_tasks(&self) -> IpcResponse {
        let engine = self.engine.lock().await;
        IpcResponse::success("", Some(ResponseData::from_tasks(engine.tracked_tasks())))
    }

    async fn handle_session_end(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        let was_active = engine.session().state.is_active();
        engine.on_session_end();

        let message = if was_active {
            "セッション終了のためタイマーを一時停止しました"
        } else {
            "セッションを終了しました"
        };
        IpcResponse::success(message, Some(engine.status()))
    }
}

fn untrackable(task_id: &str) -> IpcResponse {
    IpcResponse::error(format!(
        "タスク '{}' は存在しないか、既に完了しています",
        task_id
    ))
}

fn invalid_estimate() -> IpcResponse {
    IpcResponse::error("見積もりは1以上で指定してください")
}

// ============================================================================
// Tests
// ============================================================================
