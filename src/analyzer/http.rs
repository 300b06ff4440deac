//! 通过 /api/analyze 处理器访问 Analyzer

use std::time::Duration;

use async_trait::async_trait;

use crate::analyzer::{AnalyzeRequest, Analyzer, AnalyzerError, ClusterSummary};
use crate::llm::remote::api_error;
use crate::llm::LlmError;

pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!("{}/api/analyze", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<ClusterSummary, AnalyzerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }
        response
            .json::<ClusterSummary>()
            .await
            .map_err(|e| AnalyzerError::InvalidOutput(e.to_string()))
    }
}
