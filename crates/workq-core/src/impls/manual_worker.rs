//! ManualWorker - 返信を手で送る Worker（テスト・組み込み用）
//!
//! キューが送ったメッセージをそのまま受け取り、返信のタイミングを
//! 呼び出し側が完全に制御できます。

use tokio::sync::mpsc;

use crate::domain::errors::WorkqError;
use crate::domain::message::{WorkerMessage, WorkerReply};
use crate::ports::WorkerLink;

/// Worker side of a link, driven by hand.
///
/// Dropping it looks to the queue exactly like the worker context exiting.
pub struct ManualWorker {
    inbox: mpsc::UnboundedReceiver<WorkerMessage>,
    outbox: mpsc::UnboundedSender<WorkerReply>,
}

impl ManualWorker {
    pub fn new() -> (Self, WorkerLink) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let worker = Self {
            inbox: msg_rx,
            outbox: reply_tx,
        };
        (worker, WorkerLink::new(msg_tx, reply_rx))
    }

    /// Wait for the next message from the queue.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.inbox.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.inbox.try_recv().ok()
    }

    /// Everything the queue has sent so far.
    pub fn drain(&mut self) -> Vec<WorkerMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn reply(&self, reply: WorkerReply) -> Result<(), WorkqError> {
        self.outbox.send(reply).map_err(|_| WorkqError::WorkerGone)
    }
}
