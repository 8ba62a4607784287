//! TaskQueue - WorkerQueue の型付きファサード

use std::future::Future;
use std::marker::PhantomData;

use super::queue::WorkerQueue;
use super::status::QueueStats;
use crate::domain::Outcome;
use crate::typed::Task;

/// Typed view over a [`WorkerQueue`]: takes `T`, resolves to `T::Output`.
///
/// Encoding and decoding failures are reported as `Outcome::Error`.
pub struct TaskQueue<T: Task> {
    inner: WorkerQueue,
    _marker: PhantomData<fn(T)>,
}

impl<T: Task> TaskQueue<T> {
    pub fn new(inner: WorkerQueue) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// See [`WorkerQueue::submit`]; the job is enqueued before this returns.
    pub fn submit(&self, task: T) -> impl Future<Output = Outcome<T::Output>> + Send + 'static {
        let submitted = serde_json::to_value(&task).map(|payload| self.inner.submit(payload));
        async move {
            match submitted {
                Ok(pending) => pending.await.and_then(|value| {
                    serde_json::from_value(value).map_err(|e| format!("json decode: {e}"))
                }),
                Err(e) => Outcome::error(format!("json encode: {e}")),
            }
        }
    }

    pub fn terminate(&self) {
        self.inner.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.stats()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }
}
