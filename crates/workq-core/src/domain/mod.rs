//! Domain model (ids, outcome, worker messages, errors).

pub mod errors;
pub mod ids;
pub mod message;
pub mod outcome;

pub use self::errors::{HandlerError, WorkqError};
pub use self::ids::{Id, IdMarker, Job, JobId};
pub use self::message::{ReplyBody, WorkerMessage, WorkerReply};
pub use self::outcome::Outcome;
