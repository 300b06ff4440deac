//! text_search：description 中的大小写不敏感子串匹配

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::{QueryEngine, SqlValue};
use crate::tools::schema::{parse_args, TextSearchArgs};
use crate::tools::{clamp_limit, Tool, ToolError, ToolName};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

pub struct TextSearchTool {
    engine: QueryEngine,
}

impl TextSearchTool {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for TextSearchTool {
    fn name(&self) -> &str {
        ToolName::TextSearch.as_str()
    }

    fn description(&self) -> &str {
        ToolName::TextSearch.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::TextSearch.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: TextSearchArgs = parse_args(args)?;
        let query = args.query.trim().to_string();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("query must not be empty".into()));
        }
        let limit = clamp_limit(args.limit, DEFAULT_LIMIT, MAX_LIMIT);
        let rows = self
            .engine
            .query(
                "SELECT id, title, description, score FROM reviews
                 WHERE contains_ci(description, ?1)
                 ORDER BY id LIMIT ?2",
                vec![SqlValue::Text(query.clone()), SqlValue::Integer(limit as i64)],
            )
            .await?;
        Ok(json!({
            "query": query,
            "count": rows.len(),
            "results": rows,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dataset::demo_records;
    use crate::engine::ReviewRecord;

    fn tool() -> TextSearchTool {
        TextSearchTool::new(QueryEngine::from_records(&demo_records()).unwrap())
    }

    #[tokio::test]
    async fn test_case_insensitive_match() {
        let out = tool().execute(json!({"query": "BREAKFAST"})).await.unwrap();
        assert_eq!(out["count"], 2);
        assert_eq!(out["results"][0]["id"], 1);
        assert_eq!(out["results"][1]["id"], 8);
    }

    fn one_review(description: &str) -> ReviewRecord {
        ReviewRecord {
            id: 1,
            title: None,
            description: description.into(),
            score: 3.0,
            price: None,
            projection_x: 0.0,
            projection_y: 0.0,
            neighbors: None,
        }
    }

    #[tokio::test]
    async fn test_case_folding_beyond_ascii() {
        let engine = QueryEngine::from_records(&[one_review("Das FRÜHSTÜCK war kalt")]).unwrap();
        let out = TextSearchTool::new(engine)
            .execute(json!({"query": "frühstück"}))
            .await
            .unwrap();
        assert_eq!(out["count"], 1);
    }

    #[tokio::test]
    async fn test_limit_is_capped() {
        let out = tool().execute(json!({"query": "a", "limit": 1})).await.unwrap();
        assert_eq!(out["count"], 1);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        assert!(matches!(
            tool().execute(json!({"query": "  "})).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }
}
