//! Analyzer：把一个网格单元内的原始评论归纳为结构化分类描述
//!
//! 空输入在 `analyze_reviews` 中短路为确定性的 "Empty Cluster"，不会调用任何远程服务。

pub mod http;
pub mod llm;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpAnalyzer;
pub use llm::LlmAnalyzer;
pub use types::{AnalyzeRequest, ClusterSummary, ReviewSnippet};

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Analyzer returned unusable output: {0}")]
    InvalidOutput(String),
}

/// 委托分析服务
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<ClusterSummary, AnalyzerError>;
}

/// 调用 Analyzer；reviews 为空时直接返回空聚类结果
pub async fn analyze_reviews(
    analyzer: &dyn Analyzer,
    request: &AnalyzeRequest,
) -> Result<ClusterSummary, AnalyzerError> {
    if request.reviews.is_empty() {
        return Ok(ClusterSummary::empty(request.bin_x, request.bin_y));
    }
    analyzer.analyze(request).await
}
