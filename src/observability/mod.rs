//! 可观测性：tracing 订阅器初始化
//!
//! 服务端输出到 stdout；TUI 写日志文件，避免破坏终端画面。

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer())
        .init();
}

/// 日志写入文件（追加）
pub fn init_to_file(path: impl AsRef<Path>) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}
