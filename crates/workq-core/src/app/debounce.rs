//! Debounced - キューの前段に置くトレイリングエッジのデバウンス
//!
//! キー入力のたびに `call()` しても、静止期間（quiet period）内に次の
//! 呼び出しが来れば前の呼び出しは `Canceled` で終わり、最後の 1 回だけが
//! キューに投入されます。`flush()` は待たずに即投入します。

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use super::task_queue::TaskQueue;
use crate::domain::Outcome;
use crate::typed::Task;

pub struct Debounced<T: Task> {
    queue: Arc<TaskQueue<T>>,
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl<T: Task> Debounced<T> {
    pub fn new(queue: Arc<TaskQueue<T>>, delay: Duration) -> Self {
        Self {
            queue,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Submit `task` once no other call has arrived for the quiet period.
    ///
    /// The quiet period is measured from this call, not from the first poll.
    /// Must be called inside a tokio runtime.
    pub fn call(&self, task: T) -> impl Future<Output = Outcome<T::Output>> + Send + 'static {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + self.delay;
        let generation = Arc::clone(&self.generation);
        let queue = Arc::clone(&self.queue);

        // the timer runs on its own task so the check happens on time even if
        // the caller polls late
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if generation.load(Ordering::SeqCst) != ticket {
                return Outcome::Canceled;
            }
            queue.submit(task).await
        });
        async move { timer.await.unwrap_or(Outcome::Canceled) }
    }

    /// Submit immediately, canceling any call still waiting out its quiet period.
    pub fn flush(&self, task: T) -> impl Future<Output = Outcome<T::Output>> + Send + 'static {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.queue.submit(task)
    }

    pub fn queue(&self) -> &TaskQueue<T> {
        &self.queue
    }
}
