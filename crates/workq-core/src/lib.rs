//! workq-core
//!
//! A worker task queue with supersede-on-resubmit semantics: each queue owns
//! one background worker context, runs at most one job at a time, and lets a
//! newer submission cancel whatever older job is still pending.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, outcome, message, errors）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, WorkerLink）
//! - **typed**: 型付き Task API（Task trait, Handler trait, JobContext）
//! - **app**: キュー本体（WorkerQueue, TaskQueue, QueueBuilder, Debounced）
//! - **impls**: Worker コンテキストの実装（ThreadWorker, ManualWorker）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{BuildError, Debounced, QueueBuilder, QueueConfig, QueueStats, TaskQueue, WorkerQueue};
pub use domain::{HandlerError, JobId, Outcome, WorkqError};
pub use typed::{FnHandler, Handler, JobContext, Task};
