//! flexible_search：多词检索，AND/OR 组合，可选正则，附带每个词的命中数

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::engine::{QueryEngine, SqlValue};
use crate::tools::schema::{parse_args, FlexibleSearchArgs};
use crate::tools::{clamp_limit, Tool, ToolError, ToolName};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

pub struct FlexibleSearchTool {
    engine: QueryEngine,
}

impl FlexibleSearchTool {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}

/// 单个词的谓词与参数；正则模式下参数为 `(?i)` 前缀的模式
fn term_predicate(term: &str, regex: bool, index: usize) -> (String, SqlValue) {
    if regex {
        (
            format!("description REGEXP ?{index}"),
            SqlValue::Text(format!("(?i){term}")),
        )
    } else {
        (
            format!("contains_ci(description, ?{index})"),
            SqlValue::Text(term.to_string()),
        )
    }
}

#[async_trait]
impl Tool for FlexibleSearchTool {
    fn name(&self) -> &str {
        ToolName::FlexibleSearch.as_str()
    }

    fn description(&self) -> &str {
        ToolName::FlexibleSearch.description()
    }

    fn parameters_schema(&self) -> Value {
        ToolName::FlexibleSearch.parameters_schema()
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: FlexibleSearchArgs = parse_args(args)?;
        let terms = args.terms.into_terms(args.regex);
        if terms.is_empty() {
            return Err(ToolError::InvalidArguments("terms must contain at least one term".into()));
        }
        if args.regex {
            for term in &terms {
                Regex::new(&format!("(?i){term}")).map_err(|e| {
                    ToolError::InvalidArguments(format!("invalid regex pattern '{term}': {e}"))
                })?;
            }
        }
        let limit = clamp_limit(args.limit, DEFAULT_LIMIT, MAX_LIMIT);

        let mut term_counts = Vec::with_capacity(terms.len());
        for term in &terms {
            let (predicate, param) = term_predicate(term, args.regex, 1);
            let count = self
                .engine
                .query_count(format!("SELECT COUNT(*) FROM reviews WHERE {predicate}"), vec![param])
                .await?;
            term_counts.push(json!({ "term": term, "count": count }));
        }

        let (predicates, mut params): (Vec<String>, Vec<SqlValue>) = terms
            .iter()
            .enumerate()
            .map(|(i, term)| term_predicate(term, args.regex, i + 1))
            .unzip();
        let combined = predicates
            .iter()
            .map(|p| format!("({p})"))
            .collect::<Vec<_>>()
            .join(args.mode.as_sql());

        let total = self
            .engine
            .query_count(format!("SELECT COUNT(*) FROM reviews WHERE {combined}"), params.clone())
            .await?;
        params.push(SqlValue::Integer(limit as i64));
        let rows = self
            .engine
            .query(
                format!(
                    "SELECT id, title, description, score FROM reviews WHERE {combined} ORDER BY id LIMIT ?{}",
                    params.len()
                ),
                params,
            )
            .await?;

        Ok(json!({
            "terms": terms,
            "mode": args.mode.as_str(),
            "regex": args.regex,
            "term_counts": term_counts,
            "total": total,
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

    fn tool() -> FlexibleSearchTool {
        FlexibleSearchTool::new(QueryEngine::from_records(&demo_records()).unwrap())
    }

    #[tokio::test]
    async fn test_or_mode_with_term_counts() {
        let out = tool()
            .execute(json!({"terms": "noise|breakfast"}))
            .await
            .unwrap();
        assert_eq!(out["mode"], "OR");
        assert_eq!(out["term_counts"][0]["count"], 2);
        assert_eq!(out["term_counts"][1]["count"], 2);
        assert_eq!(out["total"], 4);
    }

    #[tokio::test]
    async fn test_and_mode() {
        let out = tool()
            .execute(json!({"terms": ["noise", "hallway"], "mode": "AND"}))
            .await
            .unwrap();
        assert_eq!(out["total"], 1);
        assert_eq!(out["results"][0]["id"], 3);
    }

    #[tokio::test]
    async fn test_regex_mode() {
        let out = tool()
            .execute(json!({"terms": ["^street", "mold$"], "regex": true}))
            .await
            .unwrap();
        assert_eq!(out["total"], 2);
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
    async fn test_plain_terms_fold_unicode_case() {
        let engine = QueryEngine::from_records(&[one_review("Das FRÜHSTÜCK war kalt")]).unwrap();
        let out = FlexibleSearchTool::new(engine)
            .execute(json!({"terms": ["frühstück", "KALT"], "mode": "AND"}))
            .await
            .unwrap();
        assert_eq!(out["term_counts"][0]["count"], 1);
        assert_eq!(out["total"], 1);
    }

    #[tokio::test]
    async fn test_regex_alternation_in_joined_string() {
        let out = tool()
            .execute(json!({"terms": "(noise|mold), breakfast", "regex": true}))
            .await
            .unwrap();
        assert_eq!(out["terms"], json!(["(noise|mold)", "breakfast"]));
        assert_eq!(out["term_counts"][0]["count"], 3);
        assert_eq!(out["total"], 5);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_descriptive_error() {
        let err = tool()
            .execute(json!({"terms": ["(unclosed"], "regex": true}))
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid regex pattern"), "{msg}");
        assert!(msg.contains("(unclosed"));
    }
}
