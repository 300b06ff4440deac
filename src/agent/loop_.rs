//! 编排循环
//!
//! 每轮：system 指令 + 对话历史（+ 收尾提示）发给模型。
//! - 最终文本：写入历史并结束
//! - 工具调用：按收到的顺序逐个分发，全部完成后把占位消息、工具结果、analyze 缓存与分类表一起提交
//!
//! 模型等待与工具等待都与 cancel_token 竞争；取消时整轮丢弃，返回 `AgentError::Cancelled`。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::events::{preview, AgentEvent};
use crate::agent::prompts::WRAP_UP_HINT;
use crate::agent::reconciler::{reconcile_round, Reconciliation};
use crate::core::AgentError;
use crate::llm::{ChatModel, ModelReply};
use crate::memory::{Message, SessionMemory};
use crate::tools::ToolDispatcher;

/// 回合上限
pub const MAX_ITERATIONS: usize = 30;
/// 剩余回合数 <= 该值时附带收尾提示
pub const WRAP_UP_THRESHOLD: usize = 3;

const RESULT_PREVIEW_CHARS: usize = 200;

fn emit(tx: Option<&mpsc::UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

/// 第 iteration 轮（从 0 计）是否附带收尾提示
pub fn needs_wrap_up(iteration: usize) -> bool {
    MAX_ITERATIONS.saturating_sub(iteration) <= WRAP_UP_THRESHOLD
}

fn build_request(system_prompt: &str, memory: &SessionMemory, wrap_up: bool) -> Vec<Message> {
    let history = memory.conversation.messages();
    let mut request = Vec::with_capacity(history.len() + 2);
    request.push(Message::system(system_prompt));
    request.extend(history.iter().cloned());
    if wrap_up {
        request.push(Message::system(WRAP_UP_HINT));
    }
    request
}

/// 运行一次回合直到得到最终文本；调用方负责先把用户消息写入 memory.conversation
pub async fn run_agent_loop(
    model: &dyn ChatModel,
    dispatcher: &ToolDispatcher,
    memory: &mut SessionMemory,
    system_prompt: &str,
    event_tx: Option<&mpsc::UnboundedSender<AgentEvent>>,
    cancel_token: CancellationToken,
) -> Result<String, AgentError> {
    for iteration in 0..MAX_ITERATIONS {
        if cancel_token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let round = iteration + 1;
        emit(
            event_tx,
            AgentEvent::Round {
                round,
                max_rounds: MAX_ITERATIONS,
            },
        );

        let wrap_up = needs_wrap_up(iteration);
        if wrap_up {
            let remaining = MAX_ITERATIONS - iteration;
            tracing::info!(round, remaining, "wrap-up hint attached");
            emit(event_tx, AgentEvent::WrapUp { remaining });
        }
        let request = build_request(system_prompt, memory, wrap_up);

        emit(event_tx, AgentEvent::Thinking);
        let reply = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
            r = model.chat(&request) => r?,
        };

        let (prompt_tokens, completion_tokens, total_tokens) = model.token_usage();
        if total_tokens > 0 {
            emit(
                event_tx,
                AgentEvent::TokenUsage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens,
                },
            );
        }

        let tool_calls = match reply {
            ModelReply::ToolCalls { tool_calls } if !tool_calls.is_empty() => tool_calls,
            ModelReply::ToolCalls { .. } => {
                tracing::warn!(round, "model returned an empty tool call list");
                memory.conversation.push(Message::assistant(""));
                emit(event_tx, AgentEvent::Response { text: String::new() });
                return Ok(String::new());
            }
            ModelReply::Response { content } => {
                tracing::info!(round, chars = content.len(), "final answer");
                memory.conversation.push(Message::assistant(content.clone()));
                emit(event_tx, AgentEvent::Response { text: content.clone() });
                return Ok(content);
            }
        };

        tracing::debug!(round, calls = tool_calls.len(), "executing tool calls");
        let mut outcomes = Vec::with_capacity(tool_calls.len());
        for call in &tool_calls {
            emit(
                event_tx,
                AgentEvent::ToolCall {
                    tool: call.name.clone(),
                    call_id: call.id.clone(),
                    args: call.arguments.clone(),
                },
            );
            let outcome = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
                o = dispatcher.dispatch(call) => o,
            };
            emit(
                event_tx,
                AgentEvent::ToolResult {
                    tool: outcome.name.clone(),
                    call_id: outcome.call_id.clone(),
                    ok: outcome.is_ok(),
                    preview: preview(&outcome.message_content(), RESULT_PREVIEW_CHARS),
                },
            );
            outcomes.push(outcome);
        }
        if cancel_token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        // 回合提交
        memory.conversation.push(Message::assistant_tool_calls(tool_calls));
        memory.conversation.extend(
            outcomes
                .iter()
                .map(|o| Message::tool(o.call_id.clone(), o.message_content())),
        );
        for r in reconcile_round(&outcomes, &mut memory.analyze_cache, &mut memory.categories) {
            let event = match r {
                Reconciliation::Saved { label, count } => AgentEvent::CategorySaved { label, count },
                Reconciliation::Unresolved { label } => AgentEvent::CategoryUnresolved { label },
            };
            emit(event_tx, event);
        }
    }

    tracing::warn!(rounds = MAX_ITERATIONS, "round budget exhausted");
    Err(AgentError::BudgetExhausted {
        rounds: MAX_ITERATIONS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_up_on_last_three_rounds() {
        let flagged: Vec<usize> = (0..MAX_ITERATIONS)
            .filter(|i| needs_wrap_up(*i))
            .map(|i| i + 1)
            .collect();
        assert_eq!(flagged, vec![28, 29, 30]);
    }
}
