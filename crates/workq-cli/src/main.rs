use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;
use workq_core::{Debounced, FnHandler, Outcome, QueueBuilder, QueueConfig};

mod tasks;

use tasks::{CompileCss, CompileHandler, Compress, compress_rle, decompress_rle};

const CONFIG: &str = "module.exports = {\n  theme: {\n    //\n  }\n}\n";
const TYPED_CSS: &str = "body { background: red; }";

fn report<T: std::fmt::Debug>(label: &str, outcome: &Outcome<T>) {
    match outcome {
        Outcome::Result(v) => println!("[{label}] result: {v:?}"),
        Outcome::Error(e) => println!("[{label}] error: {e}"),
        Outcome::Canceled => println!("[{label}] canceled"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // (A) 設定と 2 本のキュー（それぞれ専用の Worker を持つ）
    let config = QueueConfig::from_env()?;
    let compile = QueueBuilder::<CompileCss>::new()
        .handler(CompileHandler {
            latency: Duration::from_millis(50),
        })
        .config(config.clone())
        .build()?;
    let compile = Debounced::new(Arc::new(compile), config.debounce());
    let compress = QueueBuilder::<Compress>::new()
        .handler(FnHandler::new(compress_rle))
        .config(config.clone())
        .build()?;

    // (B) 初回ビルドは待たずに投入
    let initial = compile
        .flush(CompileCss {
            config: CONFIG.to_string(),
            css: "@tailwind base;".to_string(),
        })
        .await;
    report("initial", &initial);

    // (C) 1 文字ずつ入力する。コンパイルはデバウンス、URL 圧縮は毎回投入
    let mut builds = Vec::new();
    let mut urls = Vec::new();
    for end in 1..=TYPED_CSS.len() {
        let css = &TYPED_CSS[..end];
        builds.push(compile.call(CompileCss {
            config: CONFIG.to_string(),
            css: css.to_string(),
        }));
        let content = serde_json::json!({ "css": css, "config": CONFIG });
        urls.push(compress.submit(Compress {
            string: serde_json::to_string(&content)?,
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    info!(keystrokes = TYPED_CSS.len(), "finished typing");

    for (i, build) in builds.into_iter().enumerate() {
        let outcome = build.await;
        if !outcome.is_canceled() {
            report(&format!("compile #{i}"), &outcome);
        }
    }
    let mut share = None;
    for (i, url) in urls.into_iter().enumerate() {
        let outcome = url.await.map(|c| c.compressed);
        if outcome.is_error() {
            report(&format!("compress #{i}"), &outcome);
        }
        if let Some(compressed) = outcome.into_result() {
            share = Some(compressed);
        }
    }
    if let Some(compressed) = share {
        let restored = decompress_rle(&compressed)?;
        println!("[share] #{compressed} ({} -> {} chars)", restored.len(), compressed.len());
    }

    println!("compile: {:?}", compile.queue().stats());
    println!("compress: {:?}", compress.stats());

    // (D) 片付け（2 回呼んでも問題ない）
    compile.queue().terminate();
    compress.terminate();
    compress.terminate();
    Ok(())
}
