//! 工具分发器
//!
//! 持有 ToolRegistry 与全局超时，dispatch(call) 解析 arguments、在超时内执行工具，
//! 任何失败都落入 ToolOutcome.error，不向上抛出；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;

use crate::memory::ToolCall;
use crate::tools::{ToolError, ToolRegistry};

/// 统一的工具结果信封：result 与 error 恰有一个非空
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub name: String,
    pub call_id: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn success(name: impl Into<String>, call_id: impl Into<String>, result: Value) -> Self {
        Self {
            name: name.into(),
            call_id: call_id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(name: impl Into<String>, call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            call_id: call_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// 写入 tool 消息的内容：结果 JSON，或 {"error": "..."}
    pub fn message_content(&self) -> String {
        match (&self.result, &self.error) {
            (_, Some(err)) => serde_json::json!({ "error": err }).to_string(),
            (Some(result), None) => result.to_string(),
            (None, None) => "null".to_string(),
        }
    }
}

/// arguments 为空串时视为 {}
fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(format!("arguments are not valid JSON: {e}")))
}

/// 工具分发器：对每次调用施加超时，并将结果映射为 ToolOutcome
pub struct ToolDispatcher {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.registry.definitions()
    }

    /// 执行一次工具调用；解析失败、执行失败、超时均转为 error 信封
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        let start = Instant::now();
        let result = match parse_arguments(&call.arguments) {
            Ok(args) => match timeout(self.timeout, self.registry.execute(&call.name, args)).await {
                Ok(r) => r,
                Err(_) => Err(ToolError::Timeout(call.name.clone())),
            },
            Err(e) => Err(e),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ToolError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "call_id": call.id,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.arguments),
        });
        tracing::info!(audit = %audit, "tool");

        match result {
            Ok(value) => ToolOutcome::success(&call.name, &call.id, value),
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "tool failed");
                ToolOutcome::failure(&call.name, &call.id, e.to_string())
            }
        }
    }
}

fn args_preview(args: &str) -> String {
    if args.chars().count() > 200 {
        format!("{}...", args.chars().take(200).collect::<String>())
    } else {
        args.to_string()
    }
}
