//! Review Atlas 终端界面
//!
//! 入口：加载配置、日志写入文件、创建 Agent 编排器与 TUI，并运行主循环。

use anyhow::Context;
use atlas_agent::{config::load_config, core::create_agent, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 配置错误由 create_agent 记录到日志并退回默认值
    let cfg = load_config(None).unwrap_or_default();
    // TUI 占用终端，日志只写文件
    observability::init_to_file(&cfg.app.log_file)
        .with_context(|| format!("Failed to open log file {}", cfg.app.log_file.display()))?;

    let handle = create_agent(None).await.context("Failed to create agent")?;

    run_app(handle).await.context("App run failed")?;

    Ok(())
}
