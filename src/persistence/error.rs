//! Persistence error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing persisted timer state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing the state file failed.
    #[error("状態ファイルの入出力に失敗しました: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded.
    #[error("状態のシリアライズに失敗しました: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The in-process store lock was poisoned.
    #[error("状態ストアがロックできません")]
    Poisoned,
}

impl PersistenceError {
    /// Creates an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
