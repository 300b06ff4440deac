//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ATLAS__*` 覆盖（双下划线表示嵌套，如 `ATLAS__LLM__PROVIDER=mock`）。
//! API Key 不进配置文件，只读 `OPENROUTER_API_KEY`。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::{DEFAULT_MODEL, OPENROUTER_BASE_URL};

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub data: DataSection,
    pub agent: AgentSection,
    pub server: ServerSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// TUI 日志文件
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("atlas.log")
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            log_file: default_log_file(),
        }
    }
}

/// [llm] 段：后端、模型与 OpenRouter 归属头
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// openrouter / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Analyzer 使用的模型，未设置时同 model
    pub analyzer_model: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 可选模型列表（UI 展示）
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_app_title")]
    pub app_title: String,
    pub referer: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            analyzer_model: None,
            base_url: default_base_url(),
            models: default_models(),
            app_title: default_app_title(),
            referer: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

impl LlmSection {
    pub fn analyzer_model(&self) -> &str {
        self.analyzer_model.as_deref().unwrap_or(&self.model)
    }

    /// 模型是否在可选列表中；列表为空时不限制
    pub fn is_listed_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }
}

fn default_provider() -> String {
    "openrouter".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    OPENROUTER_BASE_URL.to_string()
}

fn default_models() -> Vec<String> {
    vec![
        DEFAULT_MODEL.to_string(),
        "openai/gpt-4o-mini".to_string(),
        "anthropic/claude-3.5-haiku".to_string(),
        "google/gemini-2.0-flash-001".to_string(),
    ]
}

fn default_app_title() -> String {
    "TripAdvisor Review Atlas".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [data] 段：数据集与标签文件
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    pub labels_path: Option<PathBuf>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            labels_path: None,
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/reviews.jsonl")
}

/// [agent] 段：编排后端与工具参数
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// direct：本进程直连模型；remote：经由 /api/chat 与 /api/analyze
    #[serde(default = "default_backend")]
    pub backend: String,
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// analyze_cluster 未给 bin_size 时的默认值
    #[serde(default = "default_bin_size")]
    pub default_bin_size: f64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            tool_timeout_secs: default_tool_timeout_secs(),
            default_bin_size: default_bin_size(),
        }
    }
}

fn default_backend() -> String {
    "direct".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    60
}

fn default_bin_size() -> f64 {
    1.0
}

/// [server] 段
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// remote 后端访问的服务地址
    #[serde(default = "default_server_url")]
    pub url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            url: default_server_url(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

/// 读取 API Key（空串视为未设置）
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// 加载配置：默认文件 -> 指定文件 -> ATLAS__ 环境变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ATLAS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "openrouter");
        assert_eq!(cfg.llm.model, DEFAULT_MODEL);
        assert_eq!(cfg.llm.analyzer_model(), DEFAULT_MODEL);
        assert_eq!(cfg.agent.tool_timeout_secs, 60);
        assert_eq!(cfg.agent.default_bin_size, 1.0);
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.app.log_file, PathBuf::from("atlas.log"));
        assert!(cfg.llm.is_listed_model(DEFAULT_MODEL));
        assert!(!cfg.llm.is_listed_model("someone/unknown"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"mock\"\nanalyzer_model = \"cheap/model\"\n\n[agent]\ndefault_bin_size = 0.5"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.llm.analyzer_model(), "cheap/model");
        assert_eq!(cfg.agent.default_bin_size, 0.5);
        assert_eq!(cfg.agent.backend, "direct");
    }
}
