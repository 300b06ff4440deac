//! Mock 模型（测试与离线演示用，无需 API）
//!
//! - `ScriptedChatModel`：按脚本依次返回回复，脚本用尽后重复兜底回复；记录每轮收到的完整请求
//! - `StaticLlmClient`：补全固定文本，记录调用次数

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{ChatModel, LlmClient, LlmError, ModelReply};
use crate::memory::Message;

/// 脚本化对话模型
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<Result<ModelReply, LlmError>>>,
    fallback: ModelReply,
    requests: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
}

impl ScriptedChatModel {
    pub fn new(script: Vec<ModelReply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            fallback: ModelReply::response("(script exhausted)"),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// 永远返回同一个回复（用于预算耗尽测试）
    pub fn always(reply: ModelReply) -> Self {
        Self::new(Vec::new()).with_fallback(reply)
    }

    pub fn with_fallback(mut self, reply: ModelReply) -> Self {
        self.fallback = reply;
        self
    }

    /// 每轮回复前等待（用于取消测试）
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 在脚本末尾追加一次失败
    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut s) = self.script.lock() {
            s.push_back(Err(err));
        }
    }

    /// 已收到的请求（每轮一份完整消息列表）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(&self, messages: &[Message]) -> Result<ModelReply, LlmError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(messages.to_vec());
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// 固定补全文本的客户端
pub struct StaticLlmClient {
    reply: String,
    calls: AtomicUsize,
}

impl StaticLlmClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for StaticLlmClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}
