//! 远程模型抽象
//!
//! - `ChatModel`：编排循环使用的一轮对话（可能返回工具调用，也可能返回最终文本）
//! - `LlmClient`：Analyzer 使用的纯文本补全（system + prompt -> text）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::{Message, ToolCall};

/// 远程模型调用错误
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("LLM not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 一轮对话的结果；序列化形式即 /api/chat 的响应体
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelReply {
    /// 模型要求执行工具
    ToolCalls { tool_calls: Vec<ToolCall> },
    /// 模型给出最终回复
    Response { content: String },
}

impl ModelReply {
    pub fn response(content: impl Into<String>) -> Self {
        ModelReply::Response {
            content: content.into(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        ModelReply::ToolCalls { tool_calls: calls }
    }
}

/// 支持工具调用的对话模型：messages 已包含 system 消息，工具定义由实现方持有
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[Message]) -> Result<ModelReply, LlmError>;

    /// 当前使用的模型名（UI 展示用）
    fn model_name(&self) -> &str {
        "unknown"
    }

    /// 累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 纯文本补全客户端
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
