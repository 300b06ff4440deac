//! 只读查询守卫：sql_query 的语句在进入引擎前必须通过此检查

use thiserror::Error;

/// 出现即拒绝的关键字（大小写不敏感的子串匹配）
pub const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "CREATE", "TRUNCATE",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    #[error("Query is empty")]
    Empty,

    #[error("Only SELECT queries are allowed")]
    NotSelect,

    #[error("Query contains forbidden keyword: {0}")]
    ForbiddenKeyword(&'static str),
}

/// 校验并规整 SELECT 语句：去除首尾空白与末尾分号
///
/// 关键字检查是纯子串匹配，因此 `updated_at` 之类的列名同样会被拒绝。
pub fn validate_select(sql: &str) -> Result<String, GuardViolation> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(GuardViolation::Empty);
    }
    let upper = trimmed.to_uppercase();
    if !upper.starts_with("SELECT") {
        return Err(GuardViolation::NotSelect);
    }
    if let Some(kw) = FORBIDDEN_KEYWORDS.iter().find(|kw| upper.contains(*kw)) {
        return Err(GuardViolation::ForbiddenKeyword(kw));
    }
    Ok(trimmed.trim_end_matches(';').trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_select_any_case() {
        assert_eq!(
            validate_select("  select id from reviews;  ").unwrap(),
            "select id from reviews"
        );
        assert!(validate_select("SeLeCt COUNT(*) FROM reviews").is_ok());
    }

    #[test]
    fn test_rejects_non_select() {
        assert_eq!(validate_select("PRAGMA table_info(reviews)"), Err(GuardViolation::NotSelect));
        assert_eq!(
            validate_select("WITH t AS (SELECT 1) SELECT * FROM t"),
            Err(GuardViolation::NotSelect)
        );
        assert_eq!(validate_select("   "), Err(GuardViolation::Empty));
    }

    #[test]
    fn test_rejects_forbidden_substrings() {
        assert_eq!(
            validate_select("SELECT 1; drop table reviews"),
            Err(GuardViolation::ForbiddenKeyword("DROP"))
        );
        assert_eq!(
            validate_select("SELECT updated_at FROM reviews"),
            Err(GuardViolation::ForbiddenKeyword("UPDATE"))
        );
        assert_eq!(
            validate_select("SELECT * FROM reviews WHERE description LIKE '%created%'"),
            Err(GuardViolation::ForbiddenKeyword("CREATE"))
        );
    }
}
