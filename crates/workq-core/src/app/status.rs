//! Status - キューのカウンタ
//!
//! 投入されたジョブはいずれ必ずどれか 1 つの結果に数えられる:
//! `submitted == succeeded + failed + canceled + (未決着の数)`

use serde::{Deserialize, Serialize};

use crate::domain::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub canceled: u64,
}

impl QueueStats {
    pub(crate) fn record<T>(&mut self, outcome: &Outcome<T>) {
        match outcome {
            Outcome::Result(_) => self.succeeded += 1,
            Outcome::Error(_) => self.failed += 1,
            Outcome::Canceled => self.canceled += 1,
        }
    }

    /// Jobs that have already resolved, whatever the outcome.
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed + self.canceled
    }

    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.settled())
    }
}
