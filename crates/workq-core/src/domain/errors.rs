//! Errors - エラー型と分類
//!
//! - `HandlerError`: Worker 内の計算失敗。呼び出し元には `Outcome::Error` として届く
//! - `WorkqError`: インフラ側の失敗（スレッド生成、チャネル切断、JSON）
//!
//! キャンセルはエラーではないので、ここには含めません（`Outcome::Canceled`）。

use thiserror::Error;

/// Error returned by a job handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    /// The handler noticed it was superseded and stopped early.
    #[error("job superseded")]
    Superseded,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Infrastructure errors of the queue itself.
#[derive(Debug, Error)]
pub enum WorkqError {
    #[error("worker context is gone")]
    WorkerGone,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(String),
}
