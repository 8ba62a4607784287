//! Ports - 抽象化レイヤー
//!
//! キューが外部（時刻、ID 採番、Worker コンテキスト）に依存する箇所を
//! trait / 型で切り出しています。

pub mod clock;
pub mod id_generator;
pub mod worker_link;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::worker_link::{WorkerLink, WorkerSender};
