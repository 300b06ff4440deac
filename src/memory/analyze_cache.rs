//! 会话级 analyze_cluster 结果缓存
//!
//! 每观察到一个 analyze_cluster 结果就追加一条，save_reviews 解析时只读；只在会话 reset 时清空。

use crate::analyzer::ClusterSummary;

#[derive(Clone, Debug, Default)]
pub struct AnalyzeCache {
    entries: Vec<ClusterSummary>,
}

impl AnalyzeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, summary: ClusterSummary) {
        self.entries.push(summary);
    }

    /// 最近追加的在前
    pub fn iter_recent(&self) -> impl Iterator<Item = &ClusterSummary> {
        self.entries.iter().rev()
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

    #[test]
    fn test_iter_recent_is_newest_first() {
        let mut cache = AnalyzeCache::new();
        cache.push(ClusterSummary::empty(0, 0));
        cache.push(ClusterSummary::empty(1, 1));
        let bins: Vec<_> = cache.iter_recent().map(|s| (s.bin_x, s.bin_y)).collect();
        assert_eq!(bins, vec![(1, 1), (0, 0)]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
