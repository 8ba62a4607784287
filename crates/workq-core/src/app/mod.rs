//! App - アプリケーション層
//!
//! ports と impls を組み合わせて、呼び出し側が使うキューを提供します。
//!
//! # 主要コンポーネント
//! - **WorkerQueue**: supersede 付きの直列化キュー（JSON payload）
//! - **TaskQueue**: WorkerQueue の型付きファサード
//! - **QueueBuilder**: 構築とワイヤリング（fail-fast）
//! - **Debounced**: 連続呼び出しをまとめる前段
//! - **QueueStats**: カウンタ

pub mod builder;
pub mod config;
pub mod debounce;
pub mod queue;
pub mod status;
pub mod task_queue;

pub use self::builder::{BuildError, QueueBuilder};
pub use self::config::QueueConfig;
pub use self::debounce::Debounced;
pub use self::queue::WorkerQueue;
pub use self::status::QueueStats;
pub use self::task_queue::TaskQueue;
