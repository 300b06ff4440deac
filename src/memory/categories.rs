//! 分类记忆：用户命名的分类（save_reviews 归档结果），供最终回复中的 {{label}} 占位符渲染
//!
//! 键唯一，同名写入覆盖（last-write-wins）；生命周期为会话，reset 时清空。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analyzer::ReviewSnippet;

/// 单个分类条目：save 调用的标签 + 匹配到的 analyze 结果的派生字段 + 交集成员
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub label: String,
    /// Analyzer 给出的分类名（可能与用户标签不同）
    pub category: String,
    pub sentiment: String,
    pub themes: Vec<String>,
    pub quotes: Vec<String>,
    pub avg_score: f64,
    pub count: usize,
    pub review_ids: Vec<i64>,
    pub reviews: Vec<ReviewSnippet>,
    pub bin_x: i64,
    pub bin_y: i64,
}

/// 会话级分类表
#[derive(Clone, Debug, Default, Serialize)]
pub struct CategoryMap {
    entries: BTreeMap<String, CategoryEntry>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 entry.label 为键写入，返回被覆盖的旧条目
    pub fn insert(&mut self, entry: CategoryEntry) -> Option<CategoryEntry> {
        self.entries.insert(entry.label.clone(), entry)
    }

    pub fn get(&self, label: &str) -> Option<&CategoryEntry> {
        self.entries.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.values()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, ids: Vec<i64>) -> CategoryEntry {
        CategoryEntry {
            label: label.to_string(),
            category: "Noise complaints".to_string(),
            sentiment: "negative".to_string(),
            themes: vec!["thin walls".to_string()],
            quotes: vec![],
            avg_score: 2.0,
            count: ids.len(),
            review_ids: ids,
            reviews: vec![],
            bin_x: 1,
            bin_y: 2,
        }
    }

    #[test]
    fn test_insert_same_label_overwrites() {
        let mut map = CategoryMap::new();
        assert!(map.insert(entry("Noise", vec![1, 2])).is_none());
        let prev = map.insert(entry("Noise", vec![3]));
        assert_eq!(prev.map(|e| e.review_ids), Some(vec![1, 2]));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("Noise").unwrap().review_ids, vec![3]);
    }

    #[test]
    fn test_clear() {
        let mut map = CategoryMap::new();
        map.insert(entry("A", vec![1]));
        map.insert(entry("B", vec![2]));
        assert_eq!(map.labels(), vec!["A".to_string(), "B".to_string()]);
        map.clear();
        assert!(map.is_empty());
    }
}
