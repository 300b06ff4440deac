//! 通过 /api/chat 处理器访问模型（客户端 -> 编排边界）
//!
//! 与直连 OpenRouter 等价，只是 API Key 与工具定义留在服务端。

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::llm::{ChatModel, LlmError, ModelReply};
use crate::memory::Message;

#[derive(Serialize)]
struct ChatSubmission<'a> {
    messages: &'a [Message],
}

/// HTTP 对话模型：POST {base_url}/api/chat
pub struct HttpChatModel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatModel {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// 非 2xx 响应：优先取 {"error": "..."}，否则用原始文本
pub(crate) async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(text);
    LlmError::Api { status, message }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn chat(&self, messages: &[Message]) -> Result<ModelReply, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatSubmission { messages })
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json::<ModelReply>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn model_name(&self) -> &str {
        "remote"
    }
}
