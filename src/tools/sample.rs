//! get_sample：随机抽样，可选评分区间

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::engine::{QueryEngine, SqlValue};
use crate::tools::schema::{parse_args, SampleArgs};
use crate::tools::{clamp_limit, Tool, ToolError, ToolName};

const DEFAULT_COUNT: usize = 5;
const MAX_COUNT: usize = 20;

pub struct SampleTool {
    engine: QueryEngine,
}

impl SampleTool {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for SampleTool {
    fn name(&self) -> &str {
        ToolName::GetSample.as_str()
    }

    fn description(&self) -> &str {
        ToolName::GetSample.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::GetSample.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SampleArgs = parse_args(args)?;
        if let (Some(min), Some(max)) = (args.min_score, args.max_score) {
            if min > max {
                return Err(ToolError::InvalidArguments(format!(
                    "min_score {min} is greater than max_score {max}"
                )));
            }
        }
        let count = clamp_limit(args.count, DEFAULT_COUNT, MAX_COUNT);

        let mut filters = Vec::new();
        let mut params = Vec::new();
        if let Some(min) = args.min_score {
            params.push(SqlValue::Real(min));
            filters.push(format!("score >= ?{}", params.len()));
        }
        if let Some(max) = args.max_score {
            params.push(SqlValue::Real(max));
            filters.push(format!("score <= ?{}", params.len()));
        }
        let where_clause = if filters.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };
        params.push(SqlValue::Integer(count as i64));
        let sql = format!(
            "SELECT id, title, description, score FROM reviews {where_clause} ORDER BY RANDOM() LIMIT ?{}",
            params.len()
        );
        let rows = self.engine.query(sql, params).await?;
        Ok(json!({ "count": rows.len(), "reviews": rows }))
    }
}
