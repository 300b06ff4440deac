//! Agent 会话：独占对话、分类表、analyze 缓存与可见记录
//!
//! 可见记录（transcript）只包含用户输入、最终回复与提示信息；工具往返只存在于模型侧的对话历史中。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::events::AgentEvent;
use crate::agent::loop_::run_agent_loop;
use crate::agent::prompts::{CANCELLED_NOTICE, SYSTEM_PROMPT};
use crate::core::AgentError;
use crate::llm::ChatModel;
use crate::memory::{CategoryMap, Message, SessionMemory};
use crate::tools::ToolDispatcher;

/// 可见记录中的一条
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum TranscriptEntry {
    User(String),
    Assistant(String),
    /// 取消等中性提示
    Notice(String),
    Error(String),
}

pub struct AgentSession {
    model: Arc<dyn ChatModel>,
    dispatcher: Arc<ToolDispatcher>,
    system_prompt: String,
    memory: SessionMemory,
    transcript: Vec<TranscriptEntry>,
    event_tx: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl AgentSession {
    pub fn new(model: Arc<dyn ChatModel>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            model,
            dispatcher,
            system_prompt: SYSTEM_PROMPT.to_string(),
            memory: SessionMemory::new(),
            transcript: Vec::new(),
            event_tx: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 运行一次用户回合；失败仍写入可见记录后返回错误
    pub async fn submit(&mut self, text: &str, cancel_token: CancellationToken) -> Result<String, AgentError> {
        self.transcript.push(TranscriptEntry::User(text.to_string()));
        self.memory.conversation.push(Message::user(text));

        let result = run_agent_loop(
            self.model.as_ref(),
            &self.dispatcher,
            &mut self.memory,
            &self.system_prompt,
            self.event_tx.as_ref(),
            cancel_token,
        )
        .await;

        match &result {
            Ok(reply) => self.transcript.push(TranscriptEntry::Assistant(reply.clone())),
            Err(AgentError::Cancelled) => {
                tracing::info!("turn cancelled");
                self.transcript.push(TranscriptEntry::Notice(CANCELLED_NOTICE.to_string()));
            }
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                self.transcript.push(TranscriptEntry::Error(e.to_string()));
                if let Some(tx) = &self.event_tx {
                    let _ = tx.send(AgentEvent::Error { text: e.to_string() });
                }
            }
        }
        result
    }

    /// 清空对话、分类表、缓存与可见记录
    pub fn reset(&mut self) {
        self.memory.clear();
        self.transcript.clear();
        tracing::info!("session reset");
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.memory.categories
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelReply, ScriptedChatModel};
    use crate::tools::ToolRegistry;

    fn session(model: ScriptedChatModel) -> AgentSession {
        AgentSession::new(
            Arc::new(model),
            Arc::new(ToolDispatcher::new(ToolRegistry::new(), 5)),
        )
    }

    #[tokio::test]
    async fn test_plain_answer_recorded() {
        let mut s = session(ScriptedChatModel::new(vec![ModelReply::response("hello")]));
        let reply = s.submit("hi", CancellationToken::new()).await.unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(
            s.transcript(),
            &[
                TranscriptEntry::User("hi".into()),
                TranscriptEntry::Assistant("hello".into())
            ]
        );
        assert_eq!(s.memory().conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_pre_cancelled_turn_shows_notice() {
        let mut s = session(ScriptedChatModel::new(vec![ModelReply::response("never")]));
        let token = CancellationToken::new();
        token.cancel();
        let err = s.submit("hi", token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(
            s.transcript().last(),
            Some(&TranscriptEntry::Notice(CANCELLED_NOTICE.into()))
        );
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let mut s = session(ScriptedChatModel::new(vec![ModelReply::response("x")]));
        s.submit("hi", CancellationToken::new()).await.unwrap();
        s.reset();
        assert!(s.transcript().is_empty());
        assert!(s.memory().conversation.is_empty());
        assert!(s.categories().is_empty());
    }
}
