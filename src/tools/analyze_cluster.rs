//! analyze_cluster：读取一个网格单元内的评论并委托 Analyzer 归纳
//!
//! 单元成员由 SQL 函数 `bin_of(coord, size)`（即 floor(coord / size)）判定，与客户端的分箱一致；
//! 空单元直接返回 "Empty Cluster"，不触发远程调用。原始行回填到结果的 reviews 字段。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::analyzer::{analyze_reviews, AnalyzeRequest, Analyzer, AnalyzerError, ReviewSnippet};
use crate::engine::{QueryEngine, Row, SqlValue};
use crate::tools::schema::{parse_args, AnalyzeClusterArgs};
use crate::tools::{clamp_limit, Tool, ToolError, ToolName};

const DEFAULT_SAMPLE_SIZE: usize = 10;
const MAX_SAMPLE_SIZE: usize = 80;

pub struct AnalyzeClusterTool {
    engine: QueryEngine,
    analyzer: Arc<dyn Analyzer>,
    default_bin_size: f64,
}

impl AnalyzeClusterTool {
    pub fn new(engine: QueryEngine, analyzer: Arc<dyn Analyzer>, default_bin_size: f64) -> Self {
        Self {
            engine,
            analyzer,
            default_bin_size,
        }
    }
}

fn row_to_snippet(row: &Row) -> Option<ReviewSnippet> {
    Some(ReviewSnippet {
        id: row.get("id")?.as_i64()?,
        score: row.get("score").and_then(Value::as_f64).unwrap_or(0.0),
        title: row
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        text: row
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait]
impl Tool for AnalyzeClusterTool {
    fn name(&self) -> &str {
        ToolName::AnalyzeCluster.as_str()
    }

    fn description(&self) -> &str {
        ToolName::AnalyzeCluster.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::AnalyzeCluster.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: AnalyzeClusterArgs = parse_args(args)?;
        let bin_size = args.bin_size.unwrap_or(self.default_bin_size);
        if !(bin_size.is_finite() && bin_size > 0.0) {
            return Err(ToolError::InvalidArguments(format!(
                "bin_size must be a positive number, got {bin_size}"
            )));
        }
        let sample_size = clamp_limit(args.sample_size, DEFAULT_SAMPLE_SIZE, MAX_SAMPLE_SIZE);

        let rows = self
            .engine
            .query(
                "SELECT id, title, description, score FROM reviews
                 WHERE bin_of(projection_x, ?1) = ?2 AND bin_of(projection_y, ?1) = ?3
                 ORDER BY id LIMIT ?4",
                vec![
                    SqlValue::Real(bin_size),
                    SqlValue::Integer(args.bin_x),
                    SqlValue::Integer(args.bin_y),
                    SqlValue::Integer(sample_size as i64),
                ],
            )
            .await?;
        let reviews: Vec<ReviewSnippet> = rows.iter().filter_map(row_to_snippet).collect();
        tracing::debug!(
            bin_x = args.bin_x,
            bin_y = args.bin_y,
            bin_size,
            rows = reviews.len(),
            "cluster rows fetched"
        );

        let request = AnalyzeRequest {
            bin_x: args.bin_x,
            bin_y: args.bin_y,
            bin_size,
            reviews,
        };
        let mut summary = analyze_reviews(self.analyzer.as_ref(), &request).await?;
        summary.reviews = request.reviews;
        serde_json::to_value(summary)
            .map_err(|e| ToolError::Analyzer(AnalyzerError::InvalidOutput(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ClusterSummary;
    use crate::engine::dataset::demo_records;
    use crate::engine::ReviewRecord;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for Recording {
        async fn analyze(&self, request: &AnalyzeRequest) -> Result<ClusterSummary, AnalyzerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ClusterSummary {
                category: "Stub".into(),
                sentiment: "mixed".into(),
                themes: vec![],
                quotes: vec![],
                count: request.reviews.len(),
                avg_score: 0.0,
                review_ids: request.reviews.iter().map(|r| r.id).collect(),
                bin_x: request.bin_x,
                bin_y: request.bin_y,
                reviews: vec![],
            })
        }
    }

    fn tool(analyzer: Arc<Recording>) -> AnalyzeClusterTool {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        AnalyzeClusterTool::new(engine, analyzer, 1.0)
    }

    #[tokio::test]
    async fn test_bin_members_attached() {
        let analyzer = Arc::new(Recording::default());
        let out = tool(analyzer.clone())
            .execute(json!({"bin_x": 0, "bin_y": 0}))
            .await
            .unwrap();
        assert_eq!(out["review_ids"], json!([1, 2, 3, 8]));
        assert_eq!(out["reviews"].as_array().unwrap().len(), 4);
        assert_eq!(out["reviews"][1]["text"], "Street noise kept us awake all night");
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_bin() {
        let analyzer = Arc::new(Recording::default());
        let out = tool(analyzer)
            .execute(json!({"bin_x": -1, "bin_y": 2}))
            .await
            .unwrap();
        assert_eq!(out["review_ids"], json!([6]));
    }

    #[tokio::test]
    async fn test_point_on_bin_edge_uses_floor() {
        let record = ReviewRecord {
            id: 1,
            title: None,
            description: "Edge of the grid".into(),
            score: 4.0,
            price: None,
            projection_x: 1.7,
            projection_y: 0.05,
            neighbors: None,
        };
        let engine = QueryEngine::from_records(&[record]).unwrap();
        let analyzer = Arc::new(Recording::default());
        let tool = AnalyzeClusterTool::new(engine, analyzer, 0.1);

        let out = tool.execute(json!({"bin_x": 17, "bin_y": 0})).await.unwrap();
        assert_eq!(out["review_ids"], json!([1]));
        let out = tool.execute(json!({"bin_x": 16, "bin_y": 0})).await.unwrap();
        assert_eq!(out["count"], 0);
    }

    #[tokio::test]
    async fn test_sample_size_limits_rows() {
        let analyzer = Arc::new(Recording::default());
        let out = tool(analyzer)
            .execute(json!({"bin_x": 0, "bin_y": 0, "sample_size": 2}))
            .await
            .unwrap();
        assert_eq!(out["review_ids"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_empty_bin_skips_analyzer() {
        let analyzer = Arc::new(Recording::default());
        let out = tool(analyzer.clone())
            .execute(json!({"bin_x": 40, "bin_y": 40, "bin_size": 0.5}))
            .await
            .unwrap();
        assert_eq!(out["category"], "Empty Cluster");
        assert_eq!(out["count"], 0);
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_bin_size() {
        let analyzer = Arc::new(Recording::default());
        let err = tool(analyzer)
            .execute(json!({"bin_x": 0, "bin_y": 0, "bin_size": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
