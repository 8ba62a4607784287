//! Handler trait - Task を実行する Handler の定義
//!
//! - `Handler<T>`: 型付きの表層
//! - `DynHandler`: object-safe な内部表現（JSON in / JSON out）
//! - `TypedHandler<T, H>`: `Handler<T>` → `DynHandler` の type erasure
//! - `FnHandler`: 同期クロージャをそのまま Handler にする

use std::marker::PhantomData;

use async_trait::async_trait;

use super::context::JobContext;
use super::task::Task;
use crate::domain::errors::HandlerError;

/// Handler は Task を実行して結果を返す
///
/// Runs inside the worker context, never on the caller's tasks.
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T, ctx: JobContext) -> Result<T::Output, HandlerError>;
}

/// DynHandler は object-safe な Handler の抽象化
///
/// Worker は payload を JSON のまま受け取るので、型はここで消します。
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        ctx: JobContext,
    ) -> Result<serde_json::Value, HandlerError>;

    fn task_type(&self) -> &str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn(T)>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        ctx: JobContext,
    ) -> Result<serde_json::Value, HandlerError> {
        let task: T = serde_json::from_value(payload)
            .map_err(|e| HandlerError::new(format!("json decode: {e}")))?;
        let output = self.handler.handle(task, ctx).await?;
        serde_json::to_value(output).map_err(|e| HandlerError::new(format!("json encode: {e}")))
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}

/// A synchronous, function-based handler.
///
/// ```ignore
/// let handler = FnHandler::new(|task: Echo| Ok(Echoed { text: task.text }));
/// ```
pub struct FnHandler<T, F> {
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> FnHandler<T, F>
where
    T: Task,
    F: Fn(T) -> Result<T::Output, HandlerError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> Handler<T> for FnHandler<T, F>
where
    T: Task,
    F: Fn(T) -> Result<T::Output, HandlerError> + Send + Sync + 'static,
{
    async fn handle(&self, task: T, _ctx: JobContext) -> Result<T::Output, HandlerError> {
        (self.f)(task)
    }
}
