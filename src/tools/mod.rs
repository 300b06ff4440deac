//! 工具层：固定的八个工具、注册表、分发器与参数 schema

pub mod analyze_cluster;
pub mod dispatcher;
pub mod flexible_search;
pub mod registry;
pub mod sample;
pub mod save_reviews;
pub mod schema;
pub mod sql_query;
pub mod stats;
pub mod text_search;
pub mod topics;

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::analyzer::{Analyzer, AnalyzerError};
use crate::engine::{EngineError, QueryEngine};
use crate::labels::LabelSource;

pub use analyze_cluster::AnalyzeClusterTool;
pub use dispatcher::{ToolDispatcher, ToolOutcome};
pub use flexible_search::FlexibleSearchTool;
pub use registry::{Tool, ToolRegistry};
pub use sample::SampleTool;
pub use save_reviews::SaveReviewsTool;
pub use schema::tool_definitions;
pub use sql_query::SqlQueryTool;
pub use stats::StatsTool;
pub use text_search::TextSearchTool;
pub use topics::TopicsTool;

/// 工具执行错误；只会出现在 ToolOutcome.error 中
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Query rejected: {0}")]
    Disallowed(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Analyzer call failed: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Tool {0} timed out")]
    Timeout(String),
}

/// 固定的工具枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SqlQuery,
    TextSearch,
    FlexibleSearch,
    GetStats,
    GetSample,
    GetTopics,
    AnalyzeCluster,
    SaveReviews,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::SqlQuery,
        ToolName::TextSearch,
        ToolName::FlexibleSearch,
        ToolName::GetStats,
        ToolName::GetSample,
        ToolName::GetTopics,
        ToolName::AnalyzeCluster,
        ToolName::SaveReviews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SqlQuery => "sql_query",
            ToolName::TextSearch => "text_search",
            ToolName::FlexibleSearch => "flexible_search",
            ToolName::GetStats => "get_stats",
            ToolName::GetSample => "get_sample",
            ToolName::GetTopics => "get_topics",
            ToolName::AnalyzeCluster => "analyze_cluster",
            ToolName::SaveReviews => "save_reviews",
        }
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结果行数上限：limit 缺省取 default，且不超过 cap
pub(crate) fn clamp_limit(requested: Option<usize>, default: usize, cap: usize) -> usize {
    requested.unwrap_or(default).clamp(1, cap)
}

/// 注册全部八个工具
pub fn standard_registry(
    engine: QueryEngine,
    analyzer: Arc<dyn Analyzer>,
    labels: Arc<dyn LabelSource>,
    default_bin_size: f64,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SqlQueryTool::new(engine.clone()));
    registry.register(TextSearchTool::new(engine.clone()));
    registry.register(FlexibleSearchTool::new(engine.clone()));
    registry.register(StatsTool::new(engine.clone()));
    registry.register(SampleTool::new(engine.clone()));
    registry.register(TopicsTool::new(labels));
    registry.register(AnalyzeClusterTool::new(engine, analyzer, default_bin_size));
    registry.register(SaveReviewsTool);
    registry
}
