//! ThreadWorker - 専用スレッドで動く Worker コンテキスト
//!
//! # 実装詳細
//! - キューごとに OS スレッドを 1 本起動し、その中で current-thread の
//!   tokio runtime を回す
//! - キューとの間は mpsc チャネル（inbox / outbox）だけ。共有メモリは持たない
//! - ジョブは 1 件ずつ実行。`Supersede` は実行中のジョブの `JobContext` に転送
//! - ハンドラの panic は捕まえて error 返信にする（Worker は止まらない）
//!
//! CPU を握りっぱなしの同期ハンドラは、終わるまで `Supersede` を受け取れません。
//! 途中で打ち切りたいハンドラは await ポイントを持たせてください。

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::domain::{HandlerError, JobId, WorkerMessage, WorkerReply, WorkqError};
use crate::ports::WorkerLink;
use crate::typed::{DynHandler, JobContext};

type Joined = Result<Result<Value, HandlerError>, JoinError>;

pub struct ThreadWorker;

impl ThreadWorker {
    /// Start a worker thread named `thread_name` that runs jobs with `handler`.
    pub fn spawn(thread_name: &str, handler: Arc<dyn DynHandler>) -> Result<WorkerLink, WorkqError> {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let name = thread_name.to_string();

        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        // dropping reply_tx tells the queue we are gone
                        error!(worker = %name, error = %e, "failed to start worker runtime");
                        return;
                    }
                };
                info!(worker = %name, task_type = handler.task_type(), "worker started");
                runtime.block_on(run(handler, msg_rx, reply_tx));
                info!(worker = %name, "worker stopped");
            })?;

        Ok(WorkerLink::new(msg_tx, reply_rx))
    }
}

struct Running {
    id: JobId,
    superseded: watch::Sender<bool>,
    join: JoinHandle<Result<Value, HandlerError>>,
}

async fn run(
    handler: Arc<dyn DynHandler>,
    mut inbox: mpsc::UnboundedReceiver<WorkerMessage>,
    outbox: mpsc::UnboundedSender<WorkerReply>,
) {
    let mut backlog: VecDeque<(JobId, Value)> = VecDeque::new();
    let mut running: Option<Running> = None;

    loop {
        if running.is_none()
            && let Some((id, payload)) = backlog.pop_front()
        {
            running = Some(start(&handler, id, payload));
        }

        tokio::select! {
            message = inbox.recv() => match message {
                None | Some(WorkerMessage::Terminate) => break,
                Some(WorkerMessage::Run { id, payload }) => backlog.push_back((id, payload)),
                Some(WorkerMessage::Supersede { id }) => {
                    if let Some(job) = running.as_ref()
                        && job.id == id
                    {
                        let _ = job.superseded.send(true);
                    }
                }
            },
            (id, joined) = wait_running(&mut running) => {
                running = None;
                if outbox.send(to_reply(id, joined)).is_err() {
                    break;
                }
            }
        }
    }

    if let Some(job) = running {
        job.join.abort();
    }
}

fn start(handler: &Arc<dyn DynHandler>, id: JobId, payload: Value) -> Running {
    let (tx, rx) = watch::channel(false);
    let handler = Arc::clone(handler);
    let ctx = JobContext::new(id, rx);
    let join = tokio::spawn(async move { handler.handle_dyn(payload, ctx).await });
    Running {
        id,
        superseded: tx,
        join,
    }
}

async fn wait_running(running: &mut Option<Running>) -> (JobId, Joined) {
    match running {
        Some(job) => {
            let id = job.id;
            (id, (&mut job.join).await)
        }
        None => std::future::pending().await,
    }
}

fn to_reply(id: JobId, joined: Joined) -> WorkerReply {
    match joined {
        Ok(Ok(value)) => WorkerReply::result(id, value),
        Ok(Err(HandlerError::Superseded)) => WorkerReply::canceled(id),
        Ok(Err(e)) => WorkerReply::error(id, e.to_string()),
        Err(e) if e.is_panic() => {
            WorkerReply::error(id, format!("job panicked: {}", panic_message(e.into_panic())))
        }
        Err(e) => WorkerReply::error(id, e.to_string()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
