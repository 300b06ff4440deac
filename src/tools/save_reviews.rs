//! save_reviews：纯确认信封；写入分类表由会话的 reconciler 在回合提交时完成

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::schema::{parse_args, SaveReviewsArgs};
use crate::tools::{Tool, ToolError, ToolName};

pub struct SaveReviewsTool;

#[async_trait]
impl Tool for SaveReviewsTool {
    fn name(&self) -> &str {
        ToolName::SaveReviews.as_str()
    }

    fn description(&self) -> &str {
        ToolName::SaveReviews.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::SaveReviews.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SaveReviewsArgs = parse_args(args)?;
        let category = args.category.trim().to_string();
        if category.is_empty() {
            return Err(ToolError::InvalidArguments("category must not be empty".into()));
        }
        // 保留首次出现的顺序
        let mut ids: Vec<i64> = Vec::with_capacity(args.review_ids.len());
        for id in args.review_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(json!({
            "saved": true,
            "count": ids.len(),
            "category": category,
            "ids": ids,
        }))
    }
}
