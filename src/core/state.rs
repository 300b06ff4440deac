//! 状态定义：UiState 投影
//!
//! UI 只持有轻量的 UiState（阶段、可见记录、分类表、锁、错误）；完整会话由 Orchestrator 维护并投影到 UiState。

use serde::Serialize;

use crate::agent::{AgentSession, TranscriptEntry};
use crate::memory::CategoryMap;

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Default, Serialize)]
pub struct UiState {
    pub phase: AgentPhase,
    pub transcript: Vec<TranscriptEntry>,
    pub categories: CategoryMap,
    pub model: String,
    pub input_locked: bool,
    pub error_message: Option<String>,
}

impl UiState {
    /// 从会话投影
    pub fn project(session: &AgentSession, phase: AgentPhase, error_message: Option<String>) -> Self {
        Self {
            input_locked: matches!(phase, AgentPhase::Thinking | AgentPhase::ToolExecuting),
            phase,
            transcript: session.transcript().to_vec(),
            categories: session.categories().clone(),
            model: session.model_name().to_string(),
            error_message,
        }
    }
}

/// Agent 阶段（UI 投影用）
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub enum AgentPhase {
    #[default]
    Idle,
    Thinking,
    ToolExecuting,
    Error,
}
