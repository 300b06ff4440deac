//! `{{label}}` 占位符渲染
//!
//! 最终回复中的占位符按分类表替换为卡片；不存在的标签替换为显式的缺失标记。
//! 匹配非贪婪，标签两端空白在查找前去除，占位符之外的文本原样保留。

use std::sync::OnceLock;

use regex::Regex;

use crate::memory::{CategoryEntry, CategoryMap};

#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Text(String),
    Card(CategoryEntry),
    Missing(String),
}

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{(.+?)\}\}").unwrap())
}

/// 把文本拆分为普通文本、卡片与缺失标记
pub fn segments(text: &str, categories: &CategoryMap) -> Vec<Segment> {
    let re = placeholder_re();
    let mut out = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        let label = label.as_str().trim();
        out.push(match categories.get(label) {
            Some(entry) => Segment::Card(entry.clone()),
            None => Segment::Missing(label.to_string()),
        });
        last = whole.end();
    }
    if last < text.len() {
        out.push(Segment::Text(text[last..].to_string()));
    }
    out
}

/// 卡片的一行摘要
pub fn card_summary(entry: &CategoryEntry) -> String {
    let mut line = format!(
        "[{}: {} reviews, avg {:.1}, {}]",
        entry.label, entry.count, entry.avg_score, entry.sentiment
    );
    if !entry.themes.is_empty() {
        line.push_str(&format!(" themes: {}", entry.themes.join(", ")));
    }
    line
}

pub fn missing_marker(label: &str) -> String {
    format!("[category not found: {label}]")
}

/// 纯文本渲染
pub fn to_plain(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Text(t) => t.clone(),
            Segment::Card(entry) => card_summary(entry),
            Segment::Missing(label) => missing_marker(label),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise() -> CategoryEntry {
        CategoryEntry {
            label: "Noise".into(),
            category: "Street noise".into(),
            sentiment: "negative".into(),
            themes: vec!["traffic".into()],
            quotes: vec![],
            avg_score: 2.0,
            count: 2,
            review_ids: vec![2, 3],
            reviews: vec![],
            bin_x: 0,
            bin_y: 0,
        }
    }

    #[test]
    fn test_card_substitution() {
        let mut map = CategoryMap::new();
        map.insert(noise());
        let segs = segments("Found {{Noise}} issues", &map);
        assert_eq!(
            segs,
            vec![
                Segment::Text("Found ".into()),
                Segment::Card(noise()),
                Segment::Text(" issues".into()),
            ]
        );
    }

    #[test]
    fn test_missing_marker() {
        let segs = segments("Found {{Noise}} issues", &CategoryMap::new());
        assert_eq!(segs[1], Segment::Missing("Noise".into()));
        assert_eq!(to_plain(&segs), "Found [category not found: Noise] issues");
    }

    #[test]
    fn test_non_greedy_and_trim() {
        let mut map = CategoryMap::new();
        map.insert(noise());
        let segs = segments("{{ Noise }} and {{Pool}}", &map);
        assert!(matches!(segs[0], Segment::Card(_)));
        assert_eq!(segs[1], Segment::Text(" and ".into()));
        assert_eq!(segs[2], Segment::Missing("Pool".into()));
    }

    #[test]
    fn test_placeholder_pattern_is_shared() {
        let re = placeholder_re();
        assert!(re.is_match("{{Noise}}"));
        assert!(std::ptr::eq(re, placeholder_re()));
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "no placeholders { here } at all";
        assert_eq!(segments(text, &CategoryMap::new()), vec![Segment::Text(text.into())]);
    }
}
