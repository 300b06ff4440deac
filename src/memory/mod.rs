//! 记忆层：对话消息、分类表、analyze 结果缓存（均为会话级，reset 时清空）

pub mod analyze_cache;
pub mod categories;
pub mod conversation;

pub use analyze_cache::AnalyzeCache;
pub use categories::{CategoryEntry, CategoryMap};
pub use conversation::{ConversationMemory, Message, Role, ToolCall};

/// 单个会话独占的全部记忆；编排循环按回合整体提交
#[derive(Clone, Debug, Default)]
pub struct SessionMemory {
    pub conversation: ConversationMemory,
    pub categories: CategoryMap,
    pub analyze_cache: AnalyzeCache,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.conversation.clear();
        self.categories.clear();
        self.analyze_cache.clear();
    }
}
