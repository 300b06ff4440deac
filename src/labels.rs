//! 标签层：当前渲染在可视化上的聚类标签
//!
//! 由可视化组件通过 `LabelSource` 显式暴露，get_topics 工具只读取，不做解析。

use std::path::Path;
use std::sync::RwLock;

/// 可查询的标签来源
pub trait LabelSource: Send + Sync {
    /// 当前可见的标签；为空不是错误
    fn labels(&self) -> Vec<String>;
}

/// 进程内标签表，可由可视化层随时替换
#[derive(Debug, Default)]
pub struct StaticLabels {
    labels: RwLock<Vec<String>>,
}

impl StaticLabels {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels: RwLock::new(labels),
        }
    }

    /// 从 JSON 数组文件加载（如 `["Noise", "Breakfast"]`）
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let labels: Vec<String> = serde_json::from_str(&text)?;
        tracing::info!(count = labels.len(), "cluster labels loaded");
        Ok(Self::new(labels))
    }

    pub fn replace(&self, labels: Vec<String>) {
        if let Ok(mut guard) = self.labels.write() {
            *guard = labels;
        }
    }
}

impl LabelSource for StaticLabels {
    fn labels(&self) -> Vec<String> {
        self.labels
            .read()
            .map(|l| {
                l.iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}
