//! QueueBuilder - キューの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - handler 未登録や不正な設定は `build()` 時に `BuildError` で返す
//! - Worker スレッドの起動失敗もここで分かる

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use super::config::QueueConfig;
use super::queue::WorkerQueue;
use super::task_queue::TaskQueue;
use crate::domain::WorkqError;
use crate::impls::ThreadWorker;
use crate::ports::{IdGenerator, SystemClock, UlidGenerator, WorkerLink};
use crate::typed::{DynHandler, Handler, Task, TypedHandler};

/// Builds a [`TaskQueue`] backed by its own worker context.
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::<CompileCss>::new()
///     .handler(CompileHandler)
///     .config(QueueConfig::from_env()?)
///     .build()?;
/// ```
pub struct QueueBuilder<T: Task> {
    handler: Option<Arc<dyn DynHandler>>,
    config: QueueConfig,
    ids: Option<Arc<dyn IdGenerator>>,
    _marker: PhantomData<fn(T)>,
}

/// BuildError はキュー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no handler registered for task type '{0}'")]
    MissingHandler(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Worker(#[from] WorkqError),
}

impl<T: Task> QueueBuilder<T> {
    pub fn new() -> Self {
        Self {
            handler: None,
            config: QueueConfig::default(),
            ids: None,
            _marker: PhantomData,
        }
    }

    /// The computation the worker context runs for each job.
    pub fn handler<H: Handler<T> + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(TypedHandler::new(handler)));
        self
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    /// Spawn a [`ThreadWorker`] and attach a queue to it.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(mut self) -> Result<TaskQueue<T>, BuildError> {
        self.validate()?;
        let handler = self
            .handler
            .take()
            .ok_or(BuildError::MissingHandler(T::TYPE))?;

        let name = self.config.queue_name(T::TYPE).to_string();
        let link = ThreadWorker::spawn(&self.config.thread_name(&name), handler)?;
        Ok(self.finish(name, link))
    }

    /// Attach a queue to an existing worker context (e.g. a `ManualWorker`).
    ///
    /// Any handler set on the builder is ignored.
    pub fn connect(self, link: WorkerLink) -> Result<TaskQueue<T>, BuildError> {
        self.validate()?;
        let name = self.config.queue_name(T::TYPE).to_string();
        Ok(self.finish(name, link))
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.config.validate().map_err(|e| match e {
            WorkqError::Config(msg) => BuildError::InvalidConfig(msg),
            other => BuildError::Worker(other),
        })
    }

    fn finish(self, name: String, link: WorkerLink) -> TaskQueue<T> {
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));
        info!(queue = %name, task_type = T::TYPE, "queue started");
        TaskQueue::new(WorkerQueue::new(name, link, ids))
    }
}

impl<T: Task> Default for QueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, WorkerMessage, WorkerReply};
    use crate::impls::ManualWorker;
    use crate::ports::FixedClock;
    use crate::typed::FnHandler;
    use crate::typed::task::fixtures::{Echo, Echoed};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn echo() -> impl Handler<Echo> + 'static {
        FnHandler::new(|task: Echo| Ok(Echoed { text: task.text }))
    }

    #[tokio::test]
    async fn build_success() {
        let queue = QueueBuilder::<Echo>::new().handler(echo()).build().unwrap();
        assert_eq!(queue.name(), "echo");

        let out = queue.submit(Echo { text: "hi".into() }).await;
        assert_eq!(out, Outcome::Result(Echoed { text: "hi".into() }));
    }

    #[tokio::test]
    async fn build_missing_handler() {
        let built = QueueBuilder::<Echo>::new().build();
        assert!(matches!(built, Err(BuildError::MissingHandler("echo"))));
    }

    #[tokio::test]
    async fn build_rejects_invalid_config() {
        let config = QueueConfig {
            thread_prefix: String::new(),
            ..Default::default()
        };
        let built = QueueBuilder::<Echo>::new()
            .handler(echo())
            .config(config)
            .build();
        assert!(matches!(built, Err(BuildError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn connect_uses_configured_name_and_id_generator() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (mut worker, link) = ManualWorker::new();
        let queue = QueueBuilder::<Echo>::new()
            .config(QueueConfig::default().with_name("css"))
            .id_generator(UlidGenerator::new(FixedClock::new(at)))
            .connect(link)
            .unwrap();
        assert_eq!(queue.name(), "css");

        let pending = queue.submit(Echo { text: "x".into() });
        let Some(WorkerMessage::Run { id, payload }) = worker.recv().await else {
            panic!("expected Run");
        };
        assert_eq!(id.as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
        assert_eq!(payload, json!({"text": "x"}));

        worker
            .reply(WorkerReply::result(id, json!({"text": "y"})))
            .unwrap();
        assert_eq!(pending.await, Outcome::Result(Echoed { text: "y".into() }));
    }

    #[tokio::test]
    async fn undecodable_result_becomes_error() {
        let (mut worker, link) = ManualWorker::new();
        let queue = QueueBuilder::<Echo>::new().connect(link).unwrap();

        let pending = queue.submit(Echo { text: "x".into() });
        let Some(WorkerMessage::Run { id, .. }) = worker.recv().await else {
            panic!("expected Run");
        };
        worker.reply(WorkerReply::result(id, json!(42))).unwrap();

        match pending.await {
            Outcome::Error(msg) => assert!(msg.starts_with("json decode")),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(queue.stats().succeeded, 1);
    }
}
