//! LLM 层：对话模型与补全客户端的抽象与实现（OpenRouter / OpenAI 兼容 / HTTP 处理器 / Mock）

pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod remote;
pub mod traits;

pub use mock::{ScriptedChatModel, StaticLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use openrouter::{
    OpenRouterChatModel, OpenRouterConfig, API_KEY_MISSING_REPLY, DEFAULT_MODEL,
    OPENROUTER_BASE_URL,
};
pub use remote::HttpChatModel;
pub use traits::{ChatModel, LlmClient, LlmError, ModelReply};
