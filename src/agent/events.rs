//! 编排过程事件：供 UI 展示回合进度、工具调用、分类归档与最终回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 回合开始（从 1 计）
    Round { round: usize, max_rounds: usize },
    /// 正在等待模型
    Thinking,
    ToolCall {
        tool: String,
        call_id: String,
        args: String,
    },
    /// 工具返回（预览，避免过长）
    ToolResult {
        tool: String,
        call_id: String,
        ok: bool,
        preview: String,
    },
    /// 本轮请求附带了收尾提示
    WrapUp { remaining: usize },
    CategorySaved { label: String, count: usize },
    /// save_reviews 找不到对应的 analyze 结果
    CategoryUnresolved { label: String },
    Response { text: String },
    /// 累计 token 使用
    TokenUsage {
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    },
    Error { text: String },
}

/// 截断为预览文本
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let v = serde_json::to_value(AgentEvent::WrapUp { remaining: 2 }).unwrap();
        assert_eq!(v, serde_json::json!({"type": "wrap_up", "remaining": 2}));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("ab", 3), "ab");
    }
}
