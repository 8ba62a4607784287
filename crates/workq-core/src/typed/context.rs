//! JobContext - 実行中のジョブに渡されるコンテキスト
//!
//! Worker は `Supersede` メッセージを受け取ると、このコンテキスト経由で
//! 実行中のハンドラに知らせます。ハンドラは途中で `HandlerError::Superseded`
//! を返して打ち切ってよい（返さなくても結果は捨てられる）。

use tokio::sync::watch;

use crate::domain::ids::JobId;

#[derive(Debug, Clone)]
pub struct JobContext {
    id: JobId,
    superseded: watch::Receiver<bool>,
}

impl JobContext {
    pub fn new(id: JobId, superseded: watch::Receiver<bool>) -> Self {
        Self { id, superseded }
    }

    /// A context that is never superseded.
    pub fn detached(id: JobId) -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(id, rx)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn is_superseded(&self) -> bool {
        *self.superseded.borrow()
    }

    /// Resolves once a newer job has superseded this one.
    ///
    /// Never resolves if the notice can no longer arrive, so it is safe to
    /// race against the real work in a `select!`.
    pub async fn superseded(&mut self) {
        let closed = self.superseded.wait_for(|s| *s).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}
