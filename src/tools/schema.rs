//! 工具参数类型与 JSON Schema（schemars 自动生成）
//!
//! 参数结构同时用于反序列化模型给出的 arguments 与生成发给模型的工具定义，
//! 两者因此不会漂移。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{ToolError, ToolName};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SqlQueryArgs {
    /// A single read-only SELECT statement over the `reviews` table
    /// (id, title, description, score, price, projection_x, projection_y, neighbors).
    pub sql: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TextSearchArgs {
    /// Case-insensitive substring to look for in review descriptions.
    pub query: String,
    /// Maximum number of results (default 10, max 50).
    #[serde(default)]
    pub limit: Option<usize>,
}

/// 检索词：数组，或以 `,` / `|` 分隔的字符串（正则模式下 `|` 属于模式本身，只按 `,` 拆分）
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SearchTerms {
    List(Vec<String>),
    Joined(String),
}

impl SearchTerms {
    pub fn into_terms(self, regex: bool) -> Vec<String> {
        let raw = match self {
            SearchTerms::List(list) => list,
            SearchTerms::Joined(s) if regex => s.split(',').map(String::from).collect(),
            SearchTerms::Joined(s) => s.split([',', '|']).map(String::from).collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchMode {
    And,
    #[default]
    Or,
}

impl SearchMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SearchMode::And => " AND ",
            SearchMode::Or => " OR ",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::And => "AND",
            SearchMode::Or => "OR",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FlexibleSearchArgs {
    /// Terms to match, as an array or a string separated by "," or "|" ("," only when regex is true).
    pub terms: SearchTerms,
    /// How per-term matches combine: AND or OR (default OR).
    #[serde(default)]
    pub mode: SearchMode,
    /// Treat each term as a regular expression (case-insensitive).
    #[serde(default)]
    pub regex: bool,
    /// Maximum number of results (default 10, max 50).
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct StatsArgs {
    /// Include the number of reviews per score value.
    #[serde(default)]
    pub distribution: bool,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SampleArgs {
    /// Number of random reviews (default 5, max 20).
    #[serde(default)]
    pub count: Option<usize>,
    /// Only reviews with score >= min_score.
    #[serde(default)]
    pub min_score: Option<f64>,
    /// Only reviews with score <= max_score.
    #[serde(default)]
    pub max_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct TopicsArgs {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnalyzeClusterArgs {
    /// Grid column: floor(projection_x / bin_size).
    pub bin_x: i64,
    /// Grid row: floor(projection_y / bin_size).
    pub bin_y: i64,
    /// Grid cell size in projection units.
    #[serde(default)]
    pub bin_size: Option<f64>,
    /// Reviews to read from the cell (default 10, max 80).
    #[serde(default)]
    pub sample_size: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveReviewsArgs {
    /// Label used later as {{label}} in the final answer.
    pub category: String,
    /// Ids of analyzed reviews that belong to this category.
    pub review_ids: Vec<i64>,
}

/// 把 arguments 反序列化为具体参数类型
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn schema_value<T: JsonSchema>() -> Value {
    let mut value = serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {} })
    });
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

impl ToolName {
    pub fn description(&self) -> &'static str {
        match self {
            ToolName::SqlQuery => "Run a read-only SELECT over the reviews table. Returns at most 100 rows plus the total match count.",
            ToolName::TextSearch => "Find reviews whose description contains a phrase (case-insensitive).",
            ToolName::FlexibleSearch => "Search descriptions for several terms combined with AND/OR, optionally as regular expressions. Reports per-term match counts.",
            ToolName::GetStats => "Overall review count and average/min/max score, optionally with the score distribution.",
            ToolName::GetSample => "Random reviews, optionally restricted to a score range.",
            ToolName::GetTopics => "Cluster labels currently shown on the map.",
            ToolName::AnalyzeCluster => "Summarize the reviews in one grid cell of the map (bin_x, bin_y at bin_size). Returns category, sentiment, themes, quotes and the reviews read.",
            ToolName::SaveReviews => "Save analyzed reviews under a category label so the final answer can show them with {{label}}.",
        }
    }

    pub fn parameters_schema(&self) -> Value {
        match self {
            ToolName::SqlQuery => schema_value::<SqlQueryArgs>(),
            ToolName::TextSearch => schema_value::<TextSearchArgs>(),
            ToolName::FlexibleSearch => schema_value::<FlexibleSearchArgs>(),
            ToolName::GetStats => schema_value::<StatsArgs>(),
            ToolName::GetSample => schema_value::<SampleArgs>(),
            ToolName::GetTopics => schema_value::<TopicsArgs>(),
            ToolName::AnalyzeCluster => schema_value::<AnalyzeClusterArgs>(),
            ToolName::SaveReviews => schema_value::<SaveReviewsArgs>(),
        }
    }

    /// function-calling 格式的工具定义
    pub fn definition(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.as_str(),
                "description": self.description(),
                "parameters": self.parameters_schema(),
            }
        })
    }
}

/// 全部工具定义（服务端 /api/chat 无需引擎即可附带）
pub fn tool_definitions() -> Vec<Value> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_from_joined_string() {
        let terms: SearchTerms = serde_json::from_value(serde_json::json!("noise, thin walls | ")).unwrap();
        assert_eq!(terms.into_terms(false), vec!["noise", "thin walls"]);
        let terms: SearchTerms = serde_json::from_value(serde_json::json!(["a", " ", "b"])).unwrap();
        assert_eq!(terms.into_terms(false), vec!["a", "b"]);
    }

    #[test]
    fn test_regex_terms_keep_alternation() {
        let terms: SearchTerms = serde_json::from_value(serde_json::json!("(noise|loud)")).unwrap();
        assert_eq!(terms.into_terms(true), vec!["(noise|loud)"]);
        let terms: SearchTerms = serde_json::from_value(serde_json::json!("noise|loud")).unwrap();
        assert_eq!(terms.into_terms(false), vec!["noise", "loud"]);
    }

    #[test]
    fn test_mode_default_or() {
        let args: FlexibleSearchArgs = parse_args(serde_json::json!({"terms": ["x"]})).unwrap();
        assert_eq!(args.mode, SearchMode::Or);
        let args: FlexibleSearchArgs =
            parse_args(serde_json::json!({"terms": ["x"], "mode": "AND"})).unwrap();
        assert_eq!(args.mode, SearchMode::And);
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), ToolName::ALL.len());
        let analyze = &defs[6]["function"];
        assert_eq!(analyze["name"], "analyze_cluster");
        assert!(analyze["parameters"]["properties"]["bin_x"].is_object());
        assert!(analyze["parameters"].get("$schema").is_none());
    }

    #[test]
    fn test_parse_args_error_is_invalid_arguments() {
        let err = parse_args::<SaveReviewsArgs>(serde_json::json!({"category": "x"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
