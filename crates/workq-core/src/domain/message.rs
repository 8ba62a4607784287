//! Messages exchanged between a queue and its worker context.
//!
//! Worker とキューの間は共有メモリを持たず、このメッセージだけでやり取りします。
//! - Queue → Worker: `Run`, `Supersede`, `Terminate`
//! - Worker → Queue: `WorkerReply`（id で突き合わせる）

use serde::{Deserialize, Serialize};

use super::ids::JobId;
use super::outcome::Outcome;

/// Queue → Worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Start (or queue) a job.
    Run {
        id: JobId,
        payload: serde_json::Value,
    },

    /// The job `id` has been superseded by a newer submission.
    /// Its reply will be discarded; the worker may stop early.
    Supersede { id: JobId },

    /// Tear the worker context down.
    Terminate,
}

/// Worker → Queue.
///
/// Serialized as `{"id": ..., "result": ...}`, `{"id": ..., "error": ...}`
/// or `{"id": ..., "canceled": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReply {
    pub id: JobId,
    #[serde(flatten)]
    pub body: ReplyBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyBody {
    Result(serde_json::Value),
    Error(String),
    /// The handler gave up because it saw the supersede notice.
    Canceled(bool),
}

impl WorkerReply {
    pub fn result(id: JobId, value: serde_json::Value) -> Self {
        Self {
            id,
            body: ReplyBody::Result(value),
        }
    }

    pub fn error(id: JobId, description: impl Into<String>) -> Self {
        Self {
            id,
            body: ReplyBody::Error(description.into()),
        }
    }

    pub fn canceled(id: JobId) -> Self {
        Self {
            id,
            body: ReplyBody::Canceled(true),
        }
    }
}

impl From<ReplyBody> for Outcome<serde_json::Value> {
    fn from(body: ReplyBody) -> Self {
        match body {
            ReplyBody::Result(v) => Outcome::Result(v),
            ReplyBody::Error(e) => Outcome::Error(e),
            ReplyBody::Canceled(_) => Outcome::Canceled,
        }
    }
}
