//! get_stats：评分的计数、均值、极值，可选完整分布

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::QueryEngine;
use crate::tools::schema::{parse_args, StatsArgs};
use crate::tools::{Tool, ToolError, ToolName};

pub struct StatsTool {
    engine: QueryEngine,
}

impl StatsTool {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for StatsTool {
    fn name(&self) -> &str {
        ToolName::GetStats.as_str()
    }

    fn description(&self) -> &str {
        ToolName::GetStats.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::GetStats.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: StatsArgs = parse_args(args)?;
        let summary = self
            .engine
            .query(
                "SELECT COUNT(*) AS count, AVG(score) AS avg_score,
                        MIN(score) AS min_score, MAX(score) AS max_score
                 FROM reviews",
                vec![],
            )
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut out = Value::Object(summary);
        if args.distribution {
            let buckets = self
                .engine
                .query(
                    "SELECT score, COUNT(*) AS count FROM reviews GROUP BY score ORDER BY score",
                    vec![],
                )
                .await?;
            out["distribution"] = json!(buckets);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dataset::demo_records;

    fn tool() -> StatsTool {
        StatsTool::new(QueryEngine::from_records(&demo_records()).unwrap())
    }

    #[tokio::test]
    async fn test_summary() {
        let out = tool().execute(json!({})).await.unwrap();
        assert_eq!(out["count"], 8);
        assert_eq!(out["min_score"], 1.0);
        assert_eq!(out["max_score"], 5.0);
        assert!((out["avg_score"].as_f64().unwrap() - 3.125).abs() < 1e-9);
        assert!(out.get("distribution").is_none());
    }

    #[tokio::test]
    async fn test_distribution() {
        let out = tool().execute(json!({"distribution": true})).await.unwrap();
        let buckets = out["distribution"].as_array().unwrap();
        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets[0]["score"], 1.0);
        assert_eq!(buckets[0]["count"], 1);
    }
}
