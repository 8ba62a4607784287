//! Outcome model: the terminal resolution of one submitted job.
//!
//! Every submission settles exactly once, with one of three shapes:
//! `{"result": ...}`, `{"error": "..."}` or `{"canceled": true}`.
//! Callers are expected to treat `Canceled` as "a newer job owns the result",
//! not as a failure.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Terminal resolution of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The background context produced a value.
    Result(T),

    /// The background context failed while processing this job.
    /// The queue keeps running; only this caller sees the error.
    Error(String),

    /// The job was superseded by a newer submission, or the queue was terminated.
    Canceled,
}

impl<T> Outcome<T> {
    pub fn error(description: impl Into<String>) -> Self {
        Outcome::Error(description.into())
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Outcome::Result(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }

    pub fn into_result(self) -> Option<T> {
        match self {
            Outcome::Result(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Result(v) => Outcome::Result(f(v)),
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Canceled => Outcome::Canceled,
        }
    }

    /// Like `map`, but the conversion itself may fail (e.g. decoding).
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, String>) -> Outcome<U> {
        match self {
            Outcome::Result(v) => match f(v) {
                Ok(u) => Outcome::Result(u),
                Err(e) => Outcome::Error(e),
            },
            Outcome::Error(e) => Outcome::Error(e),
            Outcome::Canceled => Outcome::Canceled,
        }
    }
}

/// Serde shape of an outcome. Exactly one field is present.
#[derive(Serialize, Deserialize)]
struct OutcomeRepr<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    canceled: bool,
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Outcome::Result(v) => OutcomeRepr {
                result: Some(v),
                error: None,
                canceled: false,
            },
            Outcome::Error(e) => OutcomeRepr {
                result: None,
                error: Some(e.clone()),
                canceled: false,
            },
            Outcome::Canceled => OutcomeRepr {
                result: None,
                error: None,
                canceled: true,
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Outcome<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = OutcomeRepr::<T>::deserialize(deserializer)?;
        match (repr.result, repr.error, repr.canceled) {
            (Some(v), None, false) => Ok(Outcome::Result(v)),
            (None, Some(e), false) => Ok(Outcome::Error(e)),
            (None, None, true) => Ok(Outcome::Canceled),
            _ => Err(de::Error::custom(
                "outcome must have exactly one of `result`, `error`, `canceled`",
            )),
        }
    }
}
