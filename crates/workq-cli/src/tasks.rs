//! Demo tasks: stand-ins for the playground's two background computations.
//!
//! - `compile`: `{config, css}` → `{css}`（本物の CSS コンパイラの代わり）
//! - `compress`: `{string}` → `{compressed}`（URL 用の圧縮の代わり。可逆な RLE）

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use workq_core::{HandlerError, Handler, JobContext, Task};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileCss {
    pub config: String,
    pub css: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledCss {
    pub css: String,
}

impl Task for CompileCss {
    const TYPE: &'static str = "compile";
    type Output = CompiledCss;
}

/// Pretends to be a slow compiler; gives up as soon as it is superseded.
pub struct CompileHandler {
    pub latency: Duration,
}

#[async_trait]
impl Handler<CompileCss> for CompileHandler {
    async fn handle(&self, task: CompileCss, mut ctx: JobContext) -> Result<CompiledCss, HandlerError> {
        debug!(job = %ctx.id(), bytes = task.css.len(), "compiling");
        tokio::select! {
            _ = ctx.superseded() => return Err(HandlerError::Superseded),
            _ = tokio::time::sleep(self.latency) => {}
        }

        let opens = task.css.matches('{').count();
        let closes = task.css.matches('}').count();
        if opens != closes {
            return Err(HandlerError::new(format!(
                "unbalanced braces ({opens} open, {closes} close)"
            )));
        }

        if ctx.is_superseded() {
            return Err(HandlerError::Superseded);
        }
        Ok(CompiledCss {
            css: format!(
                "/* ! workq demo, config {} bytes */\n{}",
                task.config.len(),
                minify(&task.css)
            ),
        })
    }
}

fn minify(css: &str) -> String {
    css.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compress {
    pub string: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compressed {
    pub compressed: String,
}

impl Task for Compress {
    const TYPE: &'static str = "compress";
    type Output = Compressed;
}

const ESCAPE: char = '~';
const MIN_RUN: usize = 5;

/// Reversible run-length encoding.
///
/// Runs of `MIN_RUN` or more become `~{n}:{c}`; everything else is copied as
/// is, except `~`, which is always written as a run. Output is never longer
/// than the input unless the input contains `~`, and only repetitive input
/// gets shorter. A stand-in for a real URL-safe compressor.
pub fn compress_rle(task: Compress) -> Result<Compressed, HandlerError> {
    let mut out = String::with_capacity(task.string.len());
    let mut chars = task.string.chars().peekable();
    while let Some(c) = chars.next() {
        let mut n = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            n += 1;
        }
        if n >= MIN_RUN || c == ESCAPE {
            out.push_str(&format!("{ESCAPE}{n}:{c}"));
        } else {
            out.extend(std::iter::repeat_n(c, n));
        }
    }
    Ok(Compressed { compressed: out })
}

/// Inverse of [`compress_rle`].
pub fn decompress_rle(compressed: &str) -> Result<String, HandlerError> {
    let malformed = || HandlerError::new(format!("malformed run in {compressed:?}"));
    let mut out = String::with_capacity(compressed.len());
    let mut chars = compressed.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        loop {
            match chars.next() {
                Some(':') => break,
                Some(d) if d.is_ascii_digit() => digits.push(d),
                _ => return Err(malformed()),
            }
        }
        let n: usize = digits.parse().map_err(|_| malformed())?;
        let repeated = chars.next().ok_or_else(malformed)?;
        out.extend(std::iter::repeat_n(repeated, n));
    }
    Ok(out)
}
