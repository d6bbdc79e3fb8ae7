//! IPC Client for communicating with the focus timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::daemon::DaemonConfig;
use crate::settings::SettingsPatch;
use crate::types::{IntervalKind, IpcRequest, IpcResponse, TaskId};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: usize = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the daemon owning `config`'s state directory.
    pub fn new(config: &DaemonConfig) -> Self {
        Self::with_socket_path(config.socket_path())
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }

    /// Starts an interval of the given kind.
    pub async fn start(&self, kind: IntervalKind) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start { kind })
            .await
    }

    /// Sends a pause command to the daemon.
    pub async fn pause(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause).await
    }

    /// Sends a resume command to the daemon.
    pub async fn resume(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Resume).await
    }

    /// Sends a reset command to the daemon.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset).await
    }

    /// Sends a skip command to the daemon.
    pub async fn skip(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Skip).await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Reads the current settings.
    pub async fn settings(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Settings).await
    }

    /// Applies a partial settings update.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::UpdateSettings { patch })
            .await
    }

    /// Adds a task to tracking.
    pub async fn track(&self, task_id: TaskId, estimate: Option<u32>) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Track { task_id, estimate })
            .await
    }

    /// Removes a task from tracking.
    pub async fn untrack(&self, task_id: TaskId) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Untrack { task_id })
            .await
    }

    /// Changes the estimate of a tracked task.
    pub async fn estimate(&self, task_id: TaskId, estimate: u32) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Estimate { task_id, estimate })
            .await
    }

    /// Selects the current task, or clears it with `None`.
    pub async fn select(&self, task_id: Option<TaskId>, track: bool) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Select { task_id, track })
            .await
    }

    /// Lists tracked tasks.
    pub async fn tasks(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Tasks).await
    }

    /// Tells the daemon the user session ended.
    pub async fn session_end(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::SessionEnd).await
    }

    /// Sends a request to the daemon, retrying only the connection.
    ///
    /// Once the request is written the daemon may already have applied it,
    /// so later failures are returned as-is. Error responses from the daemon
    /// are final.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        let stream = loop {
            match self.connect().await {
                Ok(stream) => break stream,
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!("接続失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let response = self.exchange(stream, request).await?;
        if !response.is_success() {
            anyhow::bail!("{}", error_message(&response));
        }
        Ok(response)
    }

    /// Connects to the daemon socket with timeout.
    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("Daemonに接続できません。'focus-timer daemon' を起動してください")
    }

    /// Writes one request and reads the daemon's single response.
    async fn exchange(&self, mut stream: UnixStream, request: &IpcRequest) -> Result<IpcResponse> {
        let request_json =
            serde_json::to_string(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        timeout(Duration::from_secs(IO_TIMEOUT_SECS), stream.flush())
            .await
            .context("フラッシュがタイムアウトしました")?
            .context("フラッシュに失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        // The daemon closes the connection after one response
        let mut buffer = Vec::new();
        let n = timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream)
                .take(MAX_RESPONSE_SIZE as u64 + 1)
                .read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if n == 0 {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }
        if n > MAX_RESPONSE_SIZE {
            anyhow::bail!("Daemonからの応答が大きすぎます");
        }

        serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")
    }
}

/// Joins the message and any field errors of an error response.
fn error_message(response: &IpcResponse) -> String {
    let mut message = response.message.clone();
    for error in &response.errors {
        message.push_str(&format!("\n  - {}: {}", error.field, error.message));
    }
    message
}

// ============================================================================
// Tests
// ============================================================================
