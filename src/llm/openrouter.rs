//! OpenRouter 对话客户端（支持 function calling）
//!
//! 直接使用 reqwest 发送 Chat Completions 请求：工具定义随每轮请求下发，
//! 响应中的 tool_calls 转为 `ModelReply::ToolCalls`，否则为最终文本。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{ChatModel, LlmError, ModelReply, TokenUsage};
use crate::memory::{Message, Role, ToolCall};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "x-ai/grok-4.1-fast:free";

/// 未配置 API Key 时直接回复给用户的文本（不视为错误）
pub const API_KEY_MISSING_REPLY: &str =
    "⚠️ OpenRouter API key not configured. Set OPENROUTER_API_KEY and restart.";

/// OpenRouter 客户端配置
#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// X-Title 头（OpenRouter 统计用）
    pub app_title: Option<String>,
    /// HTTP-Referer 头
    pub referer: Option<String>,
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            app_title: None,
            referer: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_app_title(mut self, title: impl Into<String>) -> Self {
        self.app_title = Some(title.into());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// 只保留首尾 4 个字符
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

fn to_wire(msg: &Message) -> WireMessage {
    let tool_calls = if msg.has_tool_calls() {
        Some(
            msg.tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    r#type: function_type(),
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect(),
        )
    } else {
        None
    };
    // 携带 tool_calls 的助手占位消息 content 置空
    let content = if msg.role == Role::Assistant && tool_calls.is_some() && msg.content.is_empty()
    {
        None
    } else {
        Some(msg.content.clone())
    };
    WireMessage {
        role: msg.role.as_str().to_string(),
        content,
        tool_call_id: msg.tool_call_id.clone(),
        tool_calls,
    }
}

fn from_wire(message: WireMessage) -> ModelReply {
    let calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let id = if tc.id.is_empty() {
                format!("call_{}", uuid::Uuid::new_v4().simple())
            } else {
                tc.id
            };
            ToolCall::new(id, tc.function.name, tc.function.arguments)
        })
        .collect();
    if calls.is_empty() {
        ModelReply::response(message.content.unwrap_or_default())
    } else {
        ModelReply::tool_calls(calls)
    }
}

/// OpenRouter 对话模型：持有 HTTP 客户端、配置与工具定义
pub struct OpenRouterChatModel {
    client: reqwest::Client,
    config: OpenRouterConfig,
    tools: Vec<Value>,
    usage: TokenUsage,
}

impl OpenRouterChatModel {
    pub fn new(config: OpenRouterConfig, tools: Vec<Value>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            tools,
            usage: TokenUsage::new(),
        }
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    /// chat/completions 请求：Bearer 认证 + 可选的 X-Title / HTTP-Referer 归属头
    fn build_request(&self, messages: &[Message]) -> reqwest::RequestBuilder {
        let body = WireRequest {
            model: &self.config.model,
            messages: messages.iter().map(to_wire).collect(),
            tools: (!self.tools.is_empty()).then_some(self.tools.as_slice()),
        };
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(title) = &self.config.app_title {
            request = request.header("X-Title", title);
        }
        if let Some(referer) = &self.config.referer {
            request = request.header("HTTP-Referer", referer);
        }
        request
    }
}

#[async_trait]
impl ChatModel for OpenRouterChatModel {
    async fn chat(&self, messages: &[Message]) -> Result<ModelReply, LlmError> {
        if self.config.api_key.trim().is_empty() {
            tracing::warn!("OPENROUTER_API_KEY missing, answering with configuration hint");
            return Ok(ModelReply::response(API_KEY_MISSING_REPLY));
        }

        let request = self.build_request(messages);
        tracing::debug!(model = %self.config.model, messages = messages.len(), "openrouter chat");
        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<WireError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: WireResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        if let Some(usage) = &parsed.usage {
            self.usage.add(usage.prompt_tokens, usage.completion_tokens);
        }
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;
        Ok(from_wire(choice.message))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        let masked = mask_api_key("sk-or-1234567890abcdefghij");
        assert!(masked.starts_with("sk-o"));
        assert!(masked.ends_with("ghij"));
        assert_eq!(mask_api_key("short"), "****");
    }

    #[test]
    fn test_assistant_placeholder_has_null_content() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new("c1", "get_topics", "{}")]);
        let wire = serde_json::to_value(to_wire(&msg)).unwrap();
        assert!(wire["content"].is_null());
        assert_eq!(wire["tool_calls"][0]["type"], "function");
        assert_eq!(wire["tool_calls"][0]["function"]["name"], "get_topics");
    }

    #[test]
    fn test_tool_message_keeps_call_id() {
        let wire = serde_json::to_value(to_wire(&Message::tool("c9", "{\"ok\":1}"))).unwrap();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "c9");
    }

    #[test]
    fn test_from_wire_tool_calls_and_text() {
        let msg: WireMessage = serde_json::from_value(serde_json::json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": "", "type": "function", "function": {"name": "get_stats", "arguments": "{}"}}]
        }))
        .unwrap();
        match from_wire(msg) {
            ModelReply::ToolCalls { tool_calls } => {
                assert_eq!(tool_calls.len(), 1);
                assert!(tool_calls[0].id.starts_with("call_"));
            }
            other => panic!("expected tool calls, got {other:?}"),
        }

        let msg: WireMessage =
            serde_json::from_value(serde_json::json!({"role": "assistant", "content": "hi"}))
                .unwrap();
        assert_eq!(from_wire(msg), ModelReply::response("hi"));
    }

    #[tokio::test]
    async fn test_missing_key_answers_with_hint() {
        let model = OpenRouterChatModel::new(OpenRouterConfig::new(""), vec![]);
        let reply = model.chat(&[Message::user("hello")]).await.unwrap();
        assert_eq!(reply, ModelReply::response(API_KEY_MISSING_REPLY));
    }

    #[test]
    fn test_request_carries_attribution_headers() {
        let config = OpenRouterConfig::new("sk-test")
            .with_base_url("https://router.example/api/v1/")
            .with_app_title("Review Atlas")
            .with_referer("https://atlas.example");
        let model = OpenRouterChatModel::new(config, vec![]);
        let request = model.build_request(&[Message::user("hi")]).build().unwrap();
        assert_eq!(request.url().as_str(), "https://router.example/api/v1/chat/completions");
        let headers = request.headers();
        assert_eq!(headers["X-Title"], "Review Atlas");
        assert_eq!(headers["HTTP-Referer"], "https://atlas.example");
        assert_eq!(headers["authorization"], "Bearer sk-test");

        let bare = OpenRouterChatModel::new(OpenRouterConfig::new("sk-test"), vec![]);
        let request = bare.build_request(&[]).build().unwrap();
        assert!(request.headers().get("X-Title").is_none());
    }
}
