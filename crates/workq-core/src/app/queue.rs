//! WorkerQueue - 単一の Worker コンテキストへのアクセスを直列化するキュー
//!
//! # 振る舞い
//! - Worker で実行中のジョブは常に高々 1 つ（in flight）
//! - 実行中に新しいジョブが来たら、実行中のジョブは superseded になる。
//!   結果が返ってきても捨て、呼び出し元には `Canceled` を返す
//! - 次に実行するジョブも高々 1 つ（next）。さらに新しいジョブが来たら
//!   古い next は即座に `Canceled` で解決し、最新のものだけを残す
//! - `terminate()` で実行中・待機中のジョブはすべて `Canceled`
//!
//! 状態遷移は `submit()` の呼び出し時点で同期的に行い、返す Future は
//! 結果を待つだけです。Worker からの返信は reply pump（tokio タスク）が
//! id で突き合わせます。

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::status::QueueStats;
use crate::domain::{JobId, Outcome, WorkerMessage, WorkerReply};
use crate::ports::{IdGenerator, WorkerLink, WorkerSender};

/// Serializes jobs onto one worker context; newer submissions supersede older ones.
///
/// Must be created inside a tokio runtime (it spawns its reply pump).
/// Dropping the queue terminates it.
pub struct WorkerQueue {
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
}

struct Shared {
    name: String,
    state: Mutex<QueueState>,
    sender: WorkerSender,
    ids: Arc<dyn IdGenerator>,
}

#[derive(Default)]
struct QueueState {
    in_flight: Option<InFlight>,
    next: Option<Queued>,
    terminated: bool,
    stats: QueueStats,
}

/// Job the worker is currently processing.
struct InFlight {
    id: JobId,
    superseded: bool,
    reply: oneshot::Sender<Outcome<Value>>,
}

/// Job waiting for the worker to become free.
struct Queued {
    id: JobId,
    payload: Value,
    reply: oneshot::Sender<Outcome<Value>>,
}

enum Pending {
    Waiting(oneshot::Receiver<Outcome<Value>>),
    Settled(Outcome<Value>),
}

impl WorkerQueue {
    pub fn new(name: impl Into<String>, link: WorkerLink, ids: Arc<dyn IdGenerator>) -> Self {
        let (sender, replies) = link.split();
        let shared = Arc::new(Shared {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            sender,
            ids,
        });
        let pump = tokio::spawn(pump_replies(Arc::clone(&shared), replies));
        Self { shared, pump }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Enqueue `payload` and return a future for its outcome.
    ///
    /// The job is enqueued (and older jobs superseded) before this returns,
    /// whether or not the future is ever polled.
    pub fn submit(&self, payload: Value) -> impl Future<Output = Outcome<Value>> + Send + 'static {
        let pending = self.shared.enqueue(payload);
        async move {
            match pending {
                // sender dropped without a value only happens on teardown
                Pending::Waiting(rx) => rx.await.unwrap_or(Outcome::Canceled),
                Pending::Settled(outcome) => outcome,
            }
        }
    }

    /// Release the worker context. Idempotent.
    pub fn terminate(&self) {
        if self.shared.terminate() {
            self.pump.abort();
            info!(queue = %self.shared.name, "queue terminated");
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.lock().terminated
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.lock().stats
    }
}

impl Drop for WorkerQueue {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, payload: Value) -> Pending {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.stats.submitted += 1;

        if state.terminated {
            debug!(queue = %self.name, "submit after terminate");
            state.stats.record(&Outcome::<Value>::Canceled);
            return Pending::Settled(Outcome::Canceled);
        }

        let id = self.ids.generate_job_id();
        let (tx, rx) = oneshot::channel();

        match state.in_flight.as_mut() {
            None => {
                if let Err(e) = self.sender.post(WorkerMessage::Run { id, payload }) {
                    warn!(queue = %self.name, %id, error = %e, "could not post job");
                    self.mark_exited(state);
                    state.stats.record(&Outcome::<Value>::Canceled);
                    return Pending::Settled(Outcome::Canceled);
                }
                debug!(queue = %self.name, %id, "job started");
                state.in_flight = Some(InFlight {
                    id,
                    superseded: false,
                    reply: tx,
                });
            }
            Some(running) => {
                if !running.superseded {
                    running.superseded = true;
                    // best effort: the reply is discarded either way
                    let _ = self.sender.post(WorkerMessage::Supersede { id: running.id });
                    debug!(queue = %self.name, id = %running.id, "in-flight job superseded");
                }
                let queued = Queued {
                    id,
                    payload,
                    reply: tx,
                };
                if let Some(dropped) = state.next.replace(queued) {
                    debug!(queue = %self.name, id = %dropped.id, "queued job replaced");
                    state.stats.record(&Outcome::<Value>::Canceled);
                    let _ = dropped.reply.send(Outcome::Canceled);
                }
            }
        }

        Pending::Waiting(rx)
    }

    fn settle(&self, reply: WorkerReply) {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(job) = state.in_flight.take_if(|job| job.id == reply.id) else {
            warn!(queue = %self.name, id = %reply.id, "ignoring reply for a job that is not in flight");
            return;
        };

        let outcome = if job.superseded {
            Outcome::Canceled
        } else {
            Outcome::from(reply.body)
        };
        debug!(queue = %self.name, id = %job.id, canceled = outcome.is_canceled(), "job settled");
        state.stats.record(&outcome);
        let _ = job.reply.send(outcome);

        if let Some(next) = state.next.take() {
            self.start(state, next);
        }
    }

    fn start(&self, state: &mut QueueState, job: Queued) {
        match self.sender.post(WorkerMessage::Run {
            id: job.id,
            payload: job.payload,
        }) {
            Ok(()) => {
                debug!(queue = %self.name, id = %job.id, "job started");
                state.in_flight = Some(InFlight {
                    id: job.id,
                    superseded: false,
                    reply: job.reply,
                });
            }
            Err(e) => {
                warn!(queue = %self.name, id = %job.id, error = %e, "could not post job");
                state.stats.record(&Outcome::<Value>::Canceled);
                let _ = job.reply.send(Outcome::Canceled);
                self.mark_exited(state);
            }
        }
    }

    /// Returns false if the queue was already terminated.
    fn terminate(&self) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.terminated {
            return false;
        }
        state.terminated = true;
        cancel_pending(state);
        let _ = self.sender.post(WorkerMessage::Terminate);
        true
    }

    fn worker_exited(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        self.mark_exited(state);
    }

    /// Same end state as `terminate`, without a `Terminate` message.
    fn mark_exited(&self, state: &mut QueueState) {
        if state.terminated {
            return;
        }
        warn!(queue = %self.name, "worker context exited; queue stops accepting work");
        state.terminated = true;
        cancel_pending(state);
    }
}

fn cancel_pending(state: &mut QueueState) {
    if let Some(job) = state.in_flight.take() {
        state.stats.record(&Outcome::<Value>::Canceled);
        let _ = job.reply.send(Outcome::Canceled);
    }
    if let Some(job) = state.next.take() {
        state.stats.record(&Outcome::<Value>::Canceled);
        let _ = job.reply.send(Outcome::Canceled);
    }
}

async fn pump_replies(shared: Arc<Shared>, mut replies: mpsc::UnboundedReceiver<WorkerReply>) {
    while let Some(reply) = replies.recv().await {
        shared.settle(reply);
    }
    shared.worker_exited();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::ManualWorker;
    use crate::ports::{SystemClock, UlidGenerator};
    use rstest::rstest;
    use serde_json::json;
    use ulid::Ulid;

    fn queue() -> (WorkerQueue, ManualWorker) {
        let (worker, link) = ManualWorker::new();
        let ids = Arc::new(UlidGenerator::new(SystemClock));
        (WorkerQueue::new("test", link, ids), worker)
    }

    async fn expect_run(worker: &mut ManualWorker) -> (JobId, Value) {
        match worker.recv().await {
            Some(WorkerMessage::Run { id, payload }) => (id, payload),
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_submission_resolves_with_result() {
        let (q, mut worker) = queue();

        let fut = q.submit(json!({"n": 1}));
        let (id, payload) = expect_run(&mut worker).await;
        assert_eq!(payload, json!({"n": 1}));

        worker.reply(WorkerReply::result(id, json!(2))).unwrap();
        assert_eq!(fut.await, Outcome::Result(json!(2)));
    }

    #[tokio::test]
    async fn worker_error_reaches_only_its_caller() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let (id_a, _) = expect_run(&mut worker).await;
        worker.reply(WorkerReply::error(id_a, "syntax error")).unwrap();
        assert_eq!(a.await, Outcome::Error("syntax error".into()));

        // queue keeps working after an error
        let b = q.submit(json!("b"));
        let (id_b, _) = expect_run(&mut worker).await;
        worker.reply(WorkerReply::result(id_b, json!("ok"))).unwrap();
        assert_eq!(b.await, Outcome::Result(json!("ok")));
        assert!(!q.is_terminated());
    }

    #[tokio::test]
    async fn newer_submission_cancels_in_flight_job() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let b = q.submit(json!("b"));

        let (id_a, _) = expect_run(&mut worker).await;
        assert_eq!(worker.recv().await, Some(WorkerMessage::Supersede { id: id_a }));

        // A's real result arrives late and must be discarded
        worker.reply(WorkerReply::result(id_a, json!("stale"))).unwrap();
        let (id_b, payload_b) = expect_run(&mut worker).await;
        assert_eq!(payload_b, json!("b"));
        worker.reply(WorkerReply::result(id_b, json!("fresh"))).unwrap();

        assert_eq!(a.await, Outcome::Canceled);
        assert_eq!(b.await, Outcome::Result(json!("fresh")));
    }

    #[tokio::test]
    async fn latest_queued_job_wins() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let b = q.submit(json!("b"));
        let c = q.submit(json!("c"));

        // B was replaced before it started; it resolves without any reply
        assert_eq!(b.await, Outcome::Canceled);

        let (id_a, _) = expect_run(&mut worker).await;
        // only one supersede notice for A
        assert_eq!(worker.recv().await, Some(WorkerMessage::Supersede { id: id_a }));
        assert!(worker.drain().is_empty());

        worker.reply(WorkerReply::result(id_a, json!("a"))).unwrap();
        let (id_c, payload_c) = expect_run(&mut worker).await;
        assert_eq!(payload_c, json!("c"));
        worker.reply(WorkerReply::result(id_c, json!("c"))).unwrap();

        assert_eq!(a.await, Outcome::Canceled);
        assert_eq!(c.await, Outcome::Result(json!("c")));
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(10)]
    #[tokio::test]
    async fn rapid_submissions_yield_at_most_one_real_outcome(#[case] n: usize) {
        let (q, mut worker) = queue();

        let futures: Vec<_> = (0..n).map(|i| q.submit(json!(i))).collect();

        // Answer every Run until the last payload has been processed.
        loop {
            match worker.recv().await {
                Some(WorkerMessage::Run { id, payload }) => {
                    let last = payload == json!(n - 1);
                    worker.reply(WorkerReply::result(id, payload)).unwrap();
                    if last {
                        break;
                    }
                }
                Some(WorkerMessage::Supersede { .. }) => {}
                other => panic!("unexpected message {other:?}"),
            }
        }

        let mut outcomes = Vec::new();
        for f in futures {
            outcomes.push(f.await);
        }
        let real: Vec<_> = outcomes.iter().filter(|o| !o.is_canceled()).collect();
        assert_eq!(real, vec![&Outcome::Result(json!(n - 1))]);

        let stats = q.stats();
        assert_eq!(stats.submitted, n as u64);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.canceled, n as u64 - 1);
    }

    #[tokio::test]
    async fn sequential_submissions_both_resolve_in_order() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let (id_a, _) = expect_run(&mut worker).await;
        worker.reply(WorkerReply::result(id_a, json!(1))).unwrap();
        assert_eq!(a.await, Outcome::Result(json!(1)));

        let b = q.submit(json!("b"));
        let (id_b, _) = expect_run(&mut worker).await;
        worker.reply(WorkerReply::result(id_b, json!(2))).unwrap();
        assert_eq!(b.await, Outcome::Result(json!(2)));

        assert_eq!(q.stats().succeeded, 2);
    }

    #[tokio::test]
    async fn terminate_cancels_in_flight_and_queued_jobs() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let b = q.submit(json!("b"));
        q.terminate();

        assert_eq!(a.await, Outcome::Canceled);
        assert_eq!(b.await, Outcome::Canceled);

        let messages = worker.drain();
        assert!(matches!(messages[0], WorkerMessage::Run { .. }));
        assert!(matches!(messages[1], WorkerMessage::Supersede { .. }));
        assert_eq!(messages[2], WorkerMessage::Terminate);
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn terminate_twice_sends_one_message() {
        let (q, mut worker) = queue();

        q.terminate();
        q.terminate();

        assert_eq!(worker.drain(), vec![WorkerMessage::Terminate]);
        assert!(q.is_terminated());
    }

    #[tokio::test]
    async fn submit_after_terminate_never_reaches_worker() {
        let (q, mut worker) = queue();
        q.terminate();
        let _ = worker.drain();

        assert_eq!(q.submit(json!("late")).await, Outcome::Canceled);
        assert!(worker.drain().is_empty());
        assert_eq!(q.stats().canceled, 1);
    }

    #[tokio::test]
    async fn reply_for_unknown_id_is_ignored() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let (id_a, _) = expect_run(&mut worker).await;

        worker
            .reply(WorkerReply::result(JobId::from_ulid(Ulid::new()), json!("bogus")))
            .unwrap();
        worker.reply(WorkerReply::result(id_a, json!("real"))).unwrap();

        assert_eq!(a.await, Outcome::Result(json!("real")));
    }

    #[tokio::test]
    async fn worker_exit_cancels_pending_jobs() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let _ = expect_run(&mut worker).await;
        drop(worker);

        assert_eq!(a.await, Outcome::Canceled);
        assert!(q.is_terminated());
    }

    #[tokio::test]
    async fn submit_to_exited_worker_is_canceled_before_pump_notices() {
        let (q, worker) = queue();
        drop(worker);

        // no yield: the reply pump has not observed the closed channel yet
        assert_eq!(q.submit(json!("a")).await, Outcome::Canceled);
        assert!(q.is_terminated());
        assert_eq!(q.submit(json!("b")).await, Outcome::Canceled);

        let stats = q.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.canceled, 2);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn queued_job_is_canceled_when_worker_exits_before_it_starts() {
        let (q, mut worker) = queue();

        let a = q.submit(json!("a"));
        let b = q.submit(json!("b"));
        let (id_a, _) = expect_run(&mut worker).await;

        // the reply is buffered, but B can no longer be posted
        worker.reply(WorkerReply::result(id_a, json!("a"))).unwrap();
        drop(worker);

        assert_eq!(a.await, Outcome::Canceled);
        assert_eq!(b.await, Outcome::Canceled);
        assert!(q.is_terminated());
        assert_eq!(q.stats().failed, 0);
    }

    #[tokio::test]
    async fn dropping_the_queue_terminates_the_worker() {
        let (q, mut worker) = queue();
        drop(q);
        assert_eq!(worker.recv().await, Some(WorkerMessage::Terminate));
    }
}
