//! HTTP 处理器（feature `web`）
//!
//! - `POST /api/chat`：转发一轮对话；请求中没有 system 消息时补上系统提示词，工具定义由模型持有
//! - `POST /api/analyze`：分析一个簇；空簇直接返回固定结果，不调用模型
//! - `GET /health`
//!
//! 处理器本身无状态，API Key 只在服务端。

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::agent::SYSTEM_PROMPT;
use crate::analyzer::{analyze_reviews, AnalyzeRequest, Analyzer, AnalyzerError};
use crate::llm::{ChatModel, LlmError};
use crate::memory::{Message, Role};
use crate::tools::ToolOutcome;

/// 处理器共享的组件
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn ChatModel>,
    pub analyzer: Arc<dyn Analyzer>,
    pub system_prompt: Arc<str>,
}

impl AppState {
    pub fn new(model: Arc<dyn ChatModel>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            model,
            analyzer,
            system_prompt: Arc::from(SYSTEM_PROMPT),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// 客户端也可以把工具结果单独提交，处理器会补成 tool 消息
    #[serde(default)]
    pub tool_results: Vec<ToolOutcome>,
}

/// 处理器错误 -> `{"error": "..."}` + 状态码
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        let status = match &e {
            LlmError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            LlmError::Api { status, .. } if *status == 429 => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(e: AnalyzerError) -> Self {
        match e {
            AnalyzerError::Llm(inner) => inner.into(),
            other => Self {
                status: StatusCode::BAD_GATEWAY,
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// 组装完整请求：补 system 消息，并把单独提交的工具结果追加为 tool 消息（已存在的 call_id 跳过）
fn prepare_messages(system_prompt: &str, req: ChatRequest) -> Vec<Message> {
    let mut messages = req.messages;
    if !messages.iter().any(|m| m.role == Role::System) {
        messages.insert(0, Message::system(system_prompt));
    }
    for outcome in req.tool_results {
        let answered = messages
            .iter()
            .any(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(outcome.call_id.as_str()));
        if !answered {
            messages.push(Message::tool(outcome.call_id.clone(), outcome.message_content()));
        }
    }
    messages
}

async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    let messages = prepare_messages(&state.system_prompt, req);
    tracing::info!(messages = messages.len(), model = state.model.model_name(), "chat round");
    let reply = state.model.chat(&messages).await.map_err(|e| {
        tracing::warn!(error = %e, "chat round failed");
        ApiError::from(e)
    })?;
    Ok(Json(reply))
}

async fn api_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        bin_x = req.bin_x,
        bin_y = req.bin_y,
        reviews = req.reviews.len(),
        "analyze cluster"
    );
    let summary = analyze_reviews(state.analyzer.as_ref(), &req).await?;
    Ok(Json(summary))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(api_chat))
        .route("/api/analyze", post(api_analyze))
        .route("/health", get(health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{ClusterSummary, ReviewSnippet};
    use crate::llm::{ModelReply, ScriptedChatModel};
    use crate::memory::ToolCall;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct CountingAnalyzer(AtomicUsize);

    #[async_trait]
    impl Analyzer for CountingAnalyzer {
        async fn analyze(&self, req: &AnalyzeRequest) -> Result<ClusterSummary, AnalyzerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            let mut s = ClusterSummary::empty(req.bin_x, req.bin_y);
            s.category = "Noise".into();
            s.count = req.reviews.len();
            Ok(s)
        }
    }

    fn app(model: Arc<ScriptedChatModel>, analyzer: Arc<CountingAnalyzer>) -> Router {
        router(AppState::new(model, analyzer))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_prepends_system_prompt() {
        let model = Arc::new(ScriptedChatModel::new(vec![ModelReply::tool_calls(vec![
            ToolCall::new("c1", "get_stats", "{}"),
        ])]));
        let analyzer = Arc::new(CountingAnalyzer(AtomicUsize::new(0)));
        let (status, body) = post_json(
            app(model.clone(), analyzer),
            "/api/chat",
            json!({ "messages": [{ "role": "user", "content": "hi" }] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "tool_calls");
        assert_eq!(body["tool_calls"][0]["name"], "get_stats");

        let sent = &model.requests()[0];
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[0].content, SYSTEM_PROMPT);
        assert_eq!(sent[1].content, "hi");
    }

    #[tokio::test]
    async fn test_chat_appends_tool_results() {
        let model = Arc::new(ScriptedChatModel::new(vec![ModelReply::response("done")]));
        let analyzer = Arc::new(CountingAnalyzer(AtomicUsize::new(0)));
        let (status, body) = post_json(
            app(model.clone(), analyzer),
            "/api/chat",
            json!({
                "messages": [
                    { "role": "system", "content": "custom" },
                    { "role": "user", "content": "stats?" },
                    { "role": "assistant", "content": "", "tool_calls": [
                        { "id": "c1", "name": "get_stats", "arguments": "{}" }
                    ] }
                ],
                "tool_results": [
                    { "name": "get_stats", "call_id": "c1", "result": { "count": 8 } }
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "type": "response", "content": "done" }));

        let sent = &model.requests()[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].content, "custom");
        assert_eq!(sent[3].role, Role::Tool);
        assert_eq!(sent[3].tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_chat_model_error_is_json() {
        let model = Arc::new(ScriptedChatModel::new(vec![]));
        model.push_error(LlmError::Api {
            status: 500,
            message: "upstream down".into(),
        });
        let analyzer = Arc::new(CountingAnalyzer(AtomicUsize::new(0)));
        let (status, body) = post_json(
            app(model, analyzer),
            "/api/chat",
            json!({ "messages": [{ "role": "user", "content": "hi" }] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn test_analyze_empty_cluster_skips_model() {
        let model = Arc::new(ScriptedChatModel::new(vec![]));
        let analyzer = Arc::new(CountingAnalyzer(AtomicUsize::new(0)));
        let (status, body) = post_json(
            app(model, analyzer.clone()),
            "/api/analyze",
            json!({ "bin_x": 3, "bin_y": -1, "bin_size": 1.0, "reviews": [] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(analyzer.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_analyze_calls_analyzer() {
        let model = Arc::new(ScriptedChatModel::new(vec![]));
        let analyzer = Arc::new(CountingAnalyzer(AtomicUsize::new(0)));
        let review = ReviewSnippet {
            id: 2,
            score: 2.0,
            title: "Sleepless".into(),
            text: "Street noise".into(),
        };
        let (status, body) = post_json(
            app(model, analyzer.clone()),
            "/api/analyze",
            json!({ "bin_x": 0, "bin_y": 0, "bin_size": 1.0, "reviews": [review] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], "Noise");
        assert_eq!(analyzer.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_health() {
        let model = Arc::new(ScriptedChatModel::new(vec![]));
        let analyzer = Arc::new(CountingAnalyzer(AtomicUsize::new(0)));
        let resp = app(model, analyzer)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&bytes).unwrap(), json!({ "status": "ok" }));
    }
}
