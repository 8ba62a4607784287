//! QueueConfig - キューの設定
//!
//! JSON または環境変数から読み込めます。どちらも未指定の項目はデフォルト値。
//!
//! | field           | env                   | default   |
//! |-----------------|-----------------------|-----------|
//! | `name`          | -                     | `T::TYPE` |
//! | `thread_prefix` | `WORKQ_THREAD_PREFIX` | `workq`   |
//! | `debounce_ms`   | `WORKQ_DEBOUNCE_MS`   | `200`     |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::WorkqError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue name used in logs; defaults to the task type.
    pub name: Option<String>,

    /// Worker threads are named `{thread_prefix}-{name}`.
    pub thread_prefix: String,

    /// Quiet period for `Debounced` callers.
    pub debounce_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: None,
            thread_prefix: "workq".to_string(),
            debounce_ms: 200,
        }
    }
}

impl QueueConfig {
    pub fn from_json(s: &str) -> Result<Self, WorkqError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read `WORKQ_*` variables from the process environment.
    pub fn from_env() -> Result<Self, WorkqError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, with an explicit lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkqError> {
        let mut config = Self::default();
        if let Some(prefix) = lookup("WORKQ_THREAD_PREFIX") {
            config.thread_prefix = prefix;
        }
        if let Some(ms) = lookup("WORKQ_DEBOUNCE_MS") {
            config.debounce_ms = ms.trim().parse().map_err(|e| {
                WorkqError::Config(format!("WORKQ_DEBOUNCE_MS={ms:?}: {e}"))
            })?;
        }
        Ok(config)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), WorkqError> {
        if self.thread_prefix.is_empty() {
            return Err(WorkqError::Config("thread_prefix must not be empty".into()));
        }
        // std::thread::Builder rejects names containing NUL
        if self.thread_prefix.contains('\0') {
            return Err(WorkqError::Config("thread_prefix must not contain NUL".into()));
        }
        if let Some(name) = &self.name
            && (name.is_empty() || name.contains('\0'))
        {
            return Err(WorkqError::Config(format!("invalid queue name {name:?}")));
        }
        Ok(())
    }

    pub fn queue_name<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }

    pub fn thread_name(&self, queue_name: &str) -> String {
        format!("{}-{}", self.thread_prefix, queue_name)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_playground_debounce() {
        let config = QueueConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(200));
        assert_eq!(config.queue_name("compile"), "compile");
        assert_eq!(config.thread_name("compile"), "workq-compile");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = QueueConfig::from_json(r#"{"name": "css"}"#).unwrap();
        assert_eq!(config.name.as_deref(), Some("css"));
        assert_eq!(config.thread_prefix, "workq");
        assert_eq!(config.debounce_ms, 200);
    }

    #[test]
    fn env_overrides_defaults() {
        let env: HashMap<&str, &str> =
            [("WORKQ_THREAD_PREFIX", "play"), ("WORKQ_DEBOUNCE_MS", " 50 ")].into();
        let config = QueueConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.thread_prefix, "play");
        assert_eq!(config.debounce_ms, 50);
    }

    #[test]
    fn env_with_bad_number_is_rejected() {
        let err = QueueConfig::from_lookup(|k| {
            (k == "WORKQ_DEBOUNCE_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, WorkqError::Config(_)));
    }

    #[rstest]
    #[case(QueueConfig { thread_prefix: String::new(), ..Default::default() })]
    #[case(QueueConfig { thread_prefix: "a\0b".into(), ..Default::default() })]
    #[case(QueueConfig::default().with_name(""))]
    fn invalid_configs_fail_validation(#[case] config: QueueConfig) {
        assert!(config.validate().is_err());
    }
}
