//! Typed - 型付き Task API
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait - object-safe, JSON で Worker に渡す

pub mod context;
pub mod handler;
pub mod task;

pub use self::context::JobContext;
pub use self::handler::{DynHandler, FnHandler, Handler, TypedHandler};
pub use self::task::Task;
