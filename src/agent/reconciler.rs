//! 分类归档：把 save_reviews 的确认与先前的 analyze_cluster 结果对上，写入分类表
//!
//! 回合提交时先把本轮所有成功的 analyze_cluster 结果追加进缓存，再按顺序处理本轮的
//! save_reviews。缓存按最近优先遍历，因此本轮结果总是先于更早的结果被检查。
//! 第一个与 save 的 id 集合有交集的结果即为匹配，之后的结果不再合并。

use serde::Deserialize;

use crate::analyzer::ClusterSummary;
use crate::memory::{AnalyzeCache, CategoryEntry, CategoryMap};
use crate::tools::{ToolName, ToolOutcome};

/// save_reviews 确认信封中用到的字段
#[derive(Debug, Deserialize)]
struct SaveAck {
    category: String,
    #[serde(default)]
    ids: Vec<i64>,
}

/// 单个 save_reviews 的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Saved { label: String, count: usize },
    Unresolved { label: String },
}

/// 在缓存中查找与 ids 有交集的最近结果，构建分类条目
pub fn resolve(label: &str, ids: &[i64], cache: &AnalyzeCache) -> Option<CategoryEntry> {
    cache.iter_recent().find_map(|summary| {
        let members = summary.member_ids();
        let shared: Vec<i64> = ids.iter().copied().filter(|id| members.contains(id)).collect();
        (!shared.is_empty()).then(|| build_entry(label, summary, shared))
    })
}

fn build_entry(label: &str, summary: &ClusterSummary, shared: Vec<i64>) -> CategoryEntry {
    let reviews = shared
        .iter()
        .filter_map(|id| summary.reviews.iter().find(|r| r.id == *id).cloned())
        .collect();
    CategoryEntry {
        label: label.to_string(),
        category: summary.category.clone(),
        sentiment: summary.sentiment.clone(),
        themes: summary.themes.clone(),
        quotes: summary.quotes.clone(),
        avg_score: summary.avg_score,
        count: shared.len(),
        review_ids: shared,
        reviews,
        bin_x: summary.bin_x,
        bin_y: summary.bin_y,
    }
}

fn is_tool(outcome: &ToolOutcome, tool: ToolName) -> bool {
    outcome.is_ok() && outcome.name == tool.as_str()
}

/// 提交一个回合的工具结果：追加 analyze 缓存，处理 save 并写入分类表
pub fn reconcile_round(
    outcomes: &[ToolOutcome],
    cache: &mut AnalyzeCache,
    categories: &mut CategoryMap,
) -> Vec<Reconciliation> {
    for outcome in outcomes.iter().filter(|o| is_tool(o, ToolName::AnalyzeCluster)) {
        let Some(result) = outcome.result.clone() else {
            continue;
        };
        match serde_json::from_value::<ClusterSummary>(result) {
            Ok(summary) => cache.push(summary),
            Err(e) => tracing::warn!(call_id = %outcome.call_id, error = %e, "unreadable analyze_cluster result"),
        }
    }

    let mut report = Vec::new();
    for outcome in outcomes.iter().filter(|o| is_tool(o, ToolName::SaveReviews)) {
        let Some(ack) = outcome
            .result
            .clone()
            .and_then(|v| serde_json::from_value::<SaveAck>(v).ok())
        else {
            continue;
        };
        match resolve(&ack.category, &ack.ids, cache) {
            Some(entry) => {
                let count = entry.count;
                if categories.insert(entry).is_some() {
                    tracing::info!(label = %ack.category, "category replaced");
                }
                tracing::info!(label = %ack.category, count, "category saved");
                report.push(Reconciliation::Saved {
                    label: ack.category,
                    count,
                });
            }
            None => {
                tracing::warn!(
                    label = %ack.category,
                    ids = ?ack.ids,
                    "no analyze_cluster result matches save_reviews ids"
                );
                report.push(Reconciliation::Unresolved { label: ack.category });
            }
        }
    }
    report
}
