//! WorkerLink port - キューから見た Worker コンテキストへの接続
//!
//! Worker の実体（専用スレッド、テスト用の手動 Worker など）が何であっても、
//! キューはこの 2 本のチャネルしか知りません。

use tokio::sync::mpsc;

use crate::domain::errors::WorkqError;
use crate::domain::message::{WorkerMessage, WorkerReply};

/// Queue-side ends of a worker's inbox and outbox.
pub struct WorkerLink {
    outbox: mpsc::UnboundedSender<WorkerMessage>,
    inbox: mpsc::UnboundedReceiver<WorkerReply>,
}

impl WorkerLink {
    pub fn new(
        outbox: mpsc::UnboundedSender<WorkerMessage>,
        inbox: mpsc::UnboundedReceiver<WorkerReply>,
    ) -> Self {
        Self { outbox, inbox }
    }

    /// Split into the sending half and the reply stream.
    pub fn split(self) -> (WorkerSender, mpsc::UnboundedReceiver<WorkerReply>) {
        (WorkerSender { tx: self.outbox }, self.inbox)
    }
}

/// Sending half of a link.
#[derive(Debug, Clone)]
pub struct WorkerSender {
    tx: mpsc::UnboundedSender<WorkerMessage>,
}

impl WorkerSender {
    pub fn post(&self, message: WorkerMessage) -> Result<(), WorkqError> {
        self.tx.send(message).map_err(|_| WorkqError::WorkerGone)
    }
}
