//! Impls - Worker コンテキストの実装
//!
//! # 含まれる実装
//! - **ThreadWorker**: 専用スレッド + current-thread runtime（本番用）
//! - **ManualWorker**: 返信を手で送る Worker（テスト・組み込み用）

pub mod manual_worker;
pub mod thread_worker;

pub use self::manual_worker::ManualWorker;
pub use self::thread_worker::ThreadWorker;
