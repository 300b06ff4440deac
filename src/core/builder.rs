//! Agent 构建器：统一的组件初始化
//!
//! TUI 与测试共用同一套装配逻辑：查询引擎、标签层、Analyzer、工具分发器、对话模型。
//! 每个组件都可以显式注入，未注入的按配置创建。

use std::sync::Arc;

use crate::analyzer::{Analyzer, HttpAnalyzer, LlmAnalyzer};
use crate::config::{api_key_from_env, AppConfig};
use crate::engine::dataset::{demo_records, load_jsonl};
use crate::engine::QueryEngine;
use crate::labels::{LabelSource, StaticLabels};
use crate::llm::{
    ChatModel, HttpChatModel, LlmClient, ModelReply, OpenAiClient, OpenRouterChatModel,
    OpenRouterConfig, ScriptedChatModel, StaticLlmClient,
};
use crate::tools::{standard_registry, ToolDispatcher};

/// mock 模式下对话模型的固定回复
pub const MOCK_REPLY: &str = "Mock mode: no model is connected. Set llm.provider = \"openrouter\" and OPENROUTER_API_KEY to chat.";

const MOCK_ANALYSIS: &str = r#"{"category":"Mock cluster","sentiment":"mixed","themes":["offline"],"quotes":[]}"#;

fn is_remote(cfg: &AppConfig) -> bool {
    cfg.agent.backend.eq_ignore_ascii_case("remote")
}

fn is_mock(cfg: &AppConfig) -> bool {
    cfg.llm.provider.eq_ignore_ascii_case("mock")
}

/// 加载数据集；文件缺失或损坏时退回内置演示数据
pub fn load_engine(cfg: &AppConfig) -> anyhow::Result<QueryEngine> {
    match load_jsonl(&cfg.data.path) {
        Ok(engine) => Ok(engine),
        Err(e) => {
            tracing::warn!(
                path = %cfg.data.path.display(),
                error = %e,
                "dataset unavailable, using built-in demo records"
            );
            Ok(QueryEngine::from_records(&demo_records())?)
        }
    }
}

pub fn load_labels(cfg: &AppConfig) -> Arc<dyn LabelSource> {
    let labels = cfg
        .data
        .labels_path
        .as_ref()
        .and_then(|p| match StaticLabels::from_file(p) {
            Ok(l) => Some(l),
            Err(e) => {
                tracing::warn!(path = %p.display(), error = %e, "labels file unreadable");
                None
            }
        })
        .unwrap_or_default();
    Arc::new(labels)
}

/// 根据配置选择 Analyzer（remote / mock / OpenAI 兼容补全）
pub fn create_analyzer_from_config(cfg: &AppConfig) -> Arc<dyn Analyzer> {
    if is_remote(cfg) {
        tracing::info!(url = %cfg.server.url, "Using remote analyzer");
        return Arc::new(HttpAnalyzer::new(&cfg.server.url, cfg.llm.timeouts.request));
    }
    let llm: Arc<dyn LlmClient> = if is_mock(cfg) {
        Arc::new(StaticLlmClient::new(MOCK_ANALYSIS))
    } else {
        let key = api_key_from_env().unwrap_or_default();
        tracing::info!(model = %cfg.llm.analyzer_model(), "Using LLM analyzer");
        Arc::new(OpenAiClient::new(&cfg.llm.base_url, cfg.llm.analyzer_model(), &key))
    };
    Arc::new(LlmAnalyzer::new(llm))
}

/// 根据配置选择对话模型（remote / mock / OpenRouter）
pub fn create_chat_model_from_config(cfg: &AppConfig, tools: Vec<serde_json::Value>) -> Arc<dyn ChatModel> {
    if is_remote(cfg) {
        tracing::info!(url = %cfg.server.url, "Using remote chat handler");
        return Arc::new(HttpChatModel::new(&cfg.server.url, cfg.llm.timeouts.request));
    }
    if is_mock(cfg) {
        tracing::warn!("Using mock chat model");
        return Arc::new(ScriptedChatModel::always(ModelReply::response(MOCK_REPLY)));
    }
    let key = api_key_from_env().unwrap_or_default();
    if key.is_empty() {
        tracing::warn!("OPENROUTER_API_KEY not set");
    }
    if !cfg.llm.is_listed_model(&cfg.llm.model) {
        tracing::warn!(model = %cfg.llm.model, available = ?cfg.llm.models, "model is not in llm.models");
    }
    let mut or_config = OpenRouterConfig::new(key)
        .with_base_url(cfg.llm.base_url.clone())
        .with_model(cfg.llm.model.clone())
        .with_timeout(std::time::Duration::from_secs(cfg.llm.timeouts.request))
        .with_app_title(cfg.llm.app_title.clone());
    if let Some(referer) = &cfg.llm.referer {
        or_config = or_config.with_referer(referer.clone());
    }
    tracing::info!(config = ?or_config, "Using OpenRouter chat model");
    Arc::new(OpenRouterChatModel::new(or_config, tools))
}

/// 装配完成的组件
pub struct AgentComponents {
    pub model: Arc<dyn ChatModel>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub engine: QueryEngine,
}

/// Agent 构建器
pub struct AgentBuilder {
    config: AppConfig,
    engine: Option<QueryEngine>,
    analyzer: Option<Arc<dyn Analyzer>>,
    labels: Option<Arc<dyn LabelSource>>,
    model: Option<Arc<dyn ChatModel>>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            engine: None,
            analyzer: None,
            labels: None,
            model: None,
        }
    }

    pub fn with_engine(mut self, engine: QueryEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_labels(mut self, labels: Arc<dyn LabelSource>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn build(self) -> anyhow::Result<AgentComponents> {
        let cfg = self.config;
        let engine = match self.engine {
            Some(e) => e,
            None => load_engine(&cfg)?,
        };
        let analyzer = self
            .analyzer
            .unwrap_or_else(|| create_analyzer_from_config(&cfg));
        let labels = self.labels.unwrap_or_else(|| load_labels(&cfg));

        let registry = standard_registry(engine.clone(), analyzer, labels, cfg.agent.default_bin_size);
        let dispatcher = Arc::new(ToolDispatcher::new(registry, cfg.agent.tool_timeout_secs));
        let model = self
            .model
            .unwrap_or_else(|| create_chat_model_from_config(&cfg, dispatcher.definitions()));
        Ok(AgentComponents {
            model,
            dispatcher,
            engine,
        })
    }
}
