//! Analyzer 边界上的数据结构：请求、评论片段、聚类摘要

use serde::{Deserialize, Serialize};

/// 送往 Analyzer 的单条评论（也作为 analyze_cluster 结果里附带的原始行）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewSnippet {
    pub id: i64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

/// Analyzer 请求：某个网格单元内抽取的评论
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub bin_x: i64,
    pub bin_y: i64,
    pub bin_size: f64,
    #[serde(default)]
    pub reviews: Vec<ReviewSnippet>,
}

/// Analyzer 返回的结构化摘要
///
/// `reviews` 不属于 Analyzer 的返回，由 analyze_cluster 工具回填原始行，供后续 save_reviews 归档。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub category: String,
    pub sentiment: String,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default)]
    pub review_ids: Vec<i64>,
    pub bin_x: i64,
    pub bin_y: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<ReviewSnippet>,
}

impl ClusterSummary {
    /// 空网格的确定性结果，不经过任何远程调用
    pub fn empty(bin_x: i64, bin_y: i64) -> Self {
        Self {
            category: "Empty Cluster".to_string(),
            sentiment: "neutral".to_string(),
            themes: Vec::new(),
            quotes: Vec::new(),
            count: 0,
            avg_score: 0.0,
            review_ids: Vec::new(),
            bin_x,
            bin_y,
            reviews: Vec::new(),
        }
    }

    /// 成员 id 集合：优先 review_ids，缺失时退回附带行的 id
    pub fn member_ids(&self) -> Vec<i64> {
        if !self.review_ids.is_empty() {
            return self.review_ids.clone();
        }
        self.reviews.iter().map(|r| r.id).collect()
    }
}
