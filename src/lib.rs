//! Review Atlas - 评论嵌入地图上的对话式分析智能体
//!
//! 模块划分：
//! - **agent**: 编排循环、分类归档、过程事件、会话
//! - **analyzer**: 簇分析边界（LLM / HTTP）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 组件装配、编排器任务、UI 状态投影
//! - **engine**: 只读 SQLite 查询引擎与 SELECT 校验
//! - **labels**: 用户自定义标签来源
//! - **llm**: 对话模型与补全客户端（OpenRouter / OpenAI 兼容 / HTTP / Mock）
//! - **memory**: 对话消息、分类表、analyze 结果缓存
//! - **render**: 回复中 `{{label}}` 占位符的解析
//! - **server**: HTTP 处理器（feature `web`）
//! - **tools**: 工具定义、注册表与分发器
//! - **ui**: Ratatui TUI 界面

pub mod agent;
pub mod analyzer;
pub mod config;
pub mod core;
pub mod engine;
pub mod labels;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod render;
#[cfg(feature = "web")]
pub mod server;
pub mod tools;
pub mod ui;
