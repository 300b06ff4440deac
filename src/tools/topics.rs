//! get_topics：读取标签层当前的聚类标签

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::labels::LabelSource;
use crate::tools::{Tool, ToolError, ToolName};

pub struct TopicsTool {
    labels: Arc<dyn LabelSource>,
}

impl TopicsTool {
    pub fn new(labels: Arc<dyn LabelSource>) -> Self {
        Self { labels }
    }
}

#[async_trait]
impl Tool for TopicsTool {
    fn name(&self) -> &str {
        ToolName::GetTopics.as_str()
    }

    fn description(&self) -> &str {
        ToolName::GetTopics.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::GetTopics.parameters_schema()
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let topics = self.labels.labels();
        Ok(json!({ "count": topics.len(), "topics": topics }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::StaticLabels;

    #[tokio::test]
    async fn test_empty_is_not_error() {
        let tool = TopicsTool::new(Arc::new(StaticLabels::default()));
        let out = tool.execute(json!({})).await.unwrap();
        assert_eq!(out["count"], 0);
        assert_eq!(out["topics"], json!([]));
    }

    #[tokio::test]
    async fn test_lists_labels() {
        let tool = TopicsTool::new(Arc::new(StaticLabels::new(vec!["Noise".into()])));
        let out = tool.execute(json!({})).await.unwrap();
        assert_eq!(out["topics"][0], "Noise");
    }
}
