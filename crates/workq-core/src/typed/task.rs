//! Task trait - 型付き Task の定義
//!
//! Task はキューに投げる payload の型と、Worker が返す結果の型を対応付けます。

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Task は payload 型と結果型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct CompileCss {
///     config: String,
///     css: String,
/// }
///
/// impl Task for CompileCss {
///     const TYPE: &'static str = "compile";
///     type Output = CompiledCss;
/// }
/// ```
///
/// # Trait Bounds
/// - `Serialize` / `DeserializeOwned`: Worker との境界は JSON メッセージ
/// - `Send + Sync + 'static`: Worker スレッドへ移動できるため
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Short name; used for the worker thread name and in logs.
    const TYPE: &'static str;

    type Output: Serialize + DeserializeOwned + Send + 'static;
}
