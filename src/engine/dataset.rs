//! 评论数据集：JSON Lines 格式，每行一条记录
//!
//! 离线管线产出的 `neighbors` 字段既可能是 JSON 字符串也可能是数组，统一以文本入库；
//! 不可解析的 neighbors 仅告警，不阻止加载。

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{EngineError, QueryEngine};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub description: String,
    pub score: f64,
    #[serde(default)]
    pub price: Option<f64>,
    pub projection_x: f64,
    pub projection_y: f64,
    #[serde(default)]
    pub neighbors: Option<Value>,
}

impl ReviewRecord {
    /// neighbors 的入库文本形式
    pub fn neighbors_text(&self) -> Option<String> {
        match &self.neighbors {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    fn neighbors_parse(&self) -> bool {
        match &self.neighbors {
            Some(Value::String(s)) => serde_json::from_str::<Value>(s).is_ok(),
            _ => true,
        }
    }
}

/// 解析 JSON Lines 文本；空行跳过，坏行报告行号
pub fn parse_jsonl(text: &str) -> Result<Vec<ReviewRecord>, EngineError> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: ReviewRecord =
            serde_json::from_str(line).map_err(|e| EngineError::Dataset {
                line: idx + 1,
                message: e.to_string(),
            })?;
        records.push(record);
    }
    Ok(records)
}

/// 从文件加载数据集并建立查询引擎
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<QueryEngine, EngineError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let records = parse_jsonl(&text)?;
    let bad_neighbors = records.iter().filter(|r| !r.neighbors_parse()).count();
    if bad_neighbors > 0 {
        tracing::warn!(count = bad_neighbors, "neighbors field is not valid JSON");
    }
    tracing::info!(path = %path.display(), rows = records.len(), "dataset loaded");
    QueryEngine::from_records(&records)
}

/// 内置的小型演示数据集（数据文件缺失时使用）
pub fn demo_records() -> Vec<ReviewRecord> {
    let rows: [(i64, &str, &str, f64, f64, f64); 8] = [
        (1, "Lovely stay", "Great breakfast, friendly staff", 5.0, 0.2, 0.3),
        (2, "Sleepless", "Street noise kept us awake all night", 2.0, 0.7, 0.1),
        (3, "Paper walls", "Thin walls, noise from the hallway every morning", 2.0, 0.5, 0.9),
        (4, "Resort feel", "Pool was clean and the view was amazing", 5.0, 1.4, 0.2),
        (5, "Never again", "Room was dirty and the bathroom had mold", 1.0, 1.8, 0.6),
        (6, "Hidden costs", "Overpriced minibar and parking fees", 3.0, -0.5, 2.3),
        (7, "Central", "Perfect location near the old town", 4.0, 3.2, 3.1),
        (8, "Meh", "Breakfast buffet was cold", 3.0, 0.1, 0.6),
    ];
    rows.into_iter()
        .map(|(id, title, description, score, x, y)| ReviewRecord {
            id,
            title: Some(title.to_string()),
            description: description.to_string(),
            score,
            price: None,
            projection_x: x,
            projection_y: y,
            neighbors: None,
        })
        .collect()
}
