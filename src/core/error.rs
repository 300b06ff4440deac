//! Agent 错误类型
//!
//! 工具层错误不会出现在这里：它们被包装进 ToolOutcome 交给模型。
//! 只有模型调用失败、预算耗尽、取消与配置错误会终止一次回合。

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("No final answer after {rounds} rounds")]
    BudgetExhausted { rounds: usize },

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AgentError::Cancelled)
    }
}
