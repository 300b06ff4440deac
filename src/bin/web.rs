//! Review Atlas HTTP 处理器
//!
//! 启动: cargo run --bin atlas-web --features web
//! TUI 以 `agent.backend = "remote"` 连接本服务时，API Key 只需配置在服务端。

#![cfg(feature = "web")]

use anyhow::Context;
use atlas_agent::config::load_config;
use atlas_agent::core::builder::{create_analyzer_from_config, create_chat_model_from_config};
use atlas_agent::observability;
use atlas_agent::server::{router, AppState};
use atlas_agent::tools::tool_definitions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut cfg = load_config(None).context("Failed to load config")?;
    // 服务端总是直连模型，否则会转发给自己
    cfg.agent.backend = "direct".to_string();

    let model = create_chat_model_from_config(&cfg, tool_definitions());
    let analyzer = create_analyzer_from_config(&cfg);
    let app = router(AppState::new(model, analyzer));

    let addr = cfg.server.bind.clone();
    tracing::info!(%addr, model = %cfg.llm.model, "atlas-web listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
