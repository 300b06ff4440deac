//! sql_query：只读 SELECT，最多返回 100 行，并报告总匹配数与是否截断
//!
//! 语句在守卫通过之前不会触达引擎。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::{validate_select, QueryEngine};
use crate::tools::schema::{parse_args, SqlQueryArgs};
use crate::tools::{Tool, ToolError, ToolName};

pub const MAX_ROWS: u64 = 100;

pub struct SqlQueryTool {
    engine: QueryEngine,
}

impl SqlQueryTool {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        ToolName::SqlQuery.as_str()
    }

    fn description(&self) -> &str {
        ToolName::SqlQuery.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::SqlQuery.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SqlQueryArgs = parse_args(args)?;
        let sql = validate_select(&args.sql).map_err(|e| ToolError::Disallowed(e.to_string()))?;

        let total = self
            .engine
            .query_count(format!("SELECT COUNT(*) FROM ({sql})"), vec![])
            .await?;
        let rows = self
            .engine
            .query(format!("SELECT * FROM ({sql}) LIMIT {MAX_ROWS}"), vec![])
            .await?;
        Ok(json!({
            "rows": rows,
            "total": total,
            "truncated": total > MAX_ROWS,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dataset::demo_records;

    fn tool() -> (SqlQueryTool, QueryEngine) {
        let engine = QueryEngine::from_records(&demo_records()).unwrap();
        (SqlQueryTool::new(engine.clone()), engine)
    }

    #[tokio::test]
    async fn test_select_returns_rows_and_total() {
        let (tool, _) = tool();
        let out = tool
            .execute(json!({"sql": "SELECT id, score FROM reviews WHERE score >= 4 ORDER BY id;"}))
            .await
            .unwrap();
        assert_eq!(out["total"], 3);
        assert_eq!(out["truncated"], false);
        assert_eq!(out["rows"][0]["id"], 1);
    }

    #[tokio::test]
    async fn test_rejected_queries_never_reach_engine() {
        let (tool, engine) = tool();
        for sql in [
            "DELETE FROM reviews",
            "select * from reviews; drop table reviews",
            "PRAGMA table_info(reviews)",
            "SELECT * FROM reviews WHERE title = 'insert'",
        ] {
            let err = tool.execute(json!({ "sql": sql })).await.unwrap_err();
            assert!(matches!(err, ToolError::Disallowed(_)), "{sql}");
        }
        assert_eq!(engine.queries_issued(), 0);
    }

    #[tokio::test]
    async fn test_sql_error_is_reported() {
        let (tool, _) = tool();
        let err = tool
            .execute(json!({"sql": "SELECT nope FROM reviews"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Engine(_)));
    }
}
