//! 基于补全模型的 Analyzer
//!
//! 模型只负责语义字段（category / sentiment / themes / quotes）；
//! count、avg_score、review_ids 与网格坐标由请求本地计算，保证与输入一致。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::analyzer::{AnalyzeRequest, Analyzer, AnalyzerError, ClusterSummary};
use crate::llm::LlmClient;

/// 单条评论送入提示词的最大字符数
const REVIEW_PROMPT_CHARS: usize = 600;
const MAX_QUOTES: usize = 5;
const MAX_THEMES: usize = 8;

pub const ANALYZER_SYSTEM_PROMPT: &str = "You analyze a cluster of customer reviews that sit close together on an embedding map. \
Reply with ONE JSON object and nothing else, shaped as: \
{\"category\": \"short descriptive name\", \"sentiment\": \"positive|negative|mixed|neutral\", \
\"themes\": [\"theme\", ...], \"quotes\": [\"verbatim short quote\", ...]}. \
Quotes must be copied verbatim from the reviews.";

#[derive(Debug, Deserialize)]
struct AnalyzerDraft {
    category: String,
    #[serde(default = "default_sentiment")]
    sentiment: String,
    #[serde(default)]
    themes: Vec<String>,
    #[serde(default)]
    quotes: Vec<String>,
}

fn default_sentiment() -> String {
    "mixed".to_string()
}

/// 从模型输出中取出 JSON（```json 代码块或首个 { 到最后一个 }）
fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

fn build_prompt(request: &AnalyzeRequest) -> String {
    let mut prompt = format!(
        "Cluster at bin ({}, {}) with bin size {}. {} reviews:\n\n",
        request.bin_x,
        request.bin_y,
        request.bin_size,
        request.reviews.len()
    );
    for r in &request.reviews {
        let text: String = r.text.chars().take(REVIEW_PROMPT_CHARS).collect();
        if r.title.is_empty() {
            prompt.push_str(&format!("- [{}] (score {}): {}\n", r.id, r.score, text));
        } else {
            prompt.push_str(&format!("- [{}] (score {}) {}: {}\n", r.id, r.score, r.title, text));
        }
    }
    prompt
}

pub struct LlmAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl LlmAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Analyzer for LlmAnalyzer {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<ClusterSummary, AnalyzerError> {
        let output = self
            .llm
            .complete(ANALYZER_SYSTEM_PROMPT, &build_prompt(request))
            .await?;
        let json = extract_json(&output)
            .ok_or_else(|| AnalyzerError::InvalidOutput(output.chars().take(200).collect()))?;
        let mut draft: AnalyzerDraft = serde_json::from_str(json)
            .map_err(|e| AnalyzerError::InvalidOutput(format!("{e}: {json}")))?;
        draft.themes.truncate(MAX_THEMES);
        draft.quotes.truncate(MAX_QUOTES);

        let count = request.reviews.len();
        let avg_score = if count == 0 {
            0.0
        } else {
            request.reviews.iter().map(|r| r.score).sum::<f64>() / count as f64
        };
        tracing::info!(
            bin_x = request.bin_x,
            bin_y = request.bin_y,
            count,
            category = %draft.category,
            "cluster analyzed"
        );
        Ok(ClusterSummary {
            category: draft.category,
            sentiment: draft.sentiment,
            themes: draft.themes,
            quotes: draft.quotes,
            count,
            avg_score,
            review_ids: request.reviews.iter().map(|r| r.id).collect(),
            bin_x: request.bin_x,
            bin_y: request.bin_y,
            reviews: Vec::new(),
        })
    }
}
