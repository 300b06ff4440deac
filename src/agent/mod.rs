//! Agent：编排循环、分类归档、过程事件、提示词与会话

pub mod events;
pub mod loop_;
pub mod prompts;
pub mod reconciler;
pub mod session;

pub use events::AgentEvent;
pub use loop_::{run_agent_loop, MAX_ITERATIONS, WRAP_UP_THRESHOLD};
pub use prompts::{CANCELLED_NOTICE, SYSTEM_PROMPT, WRAP_UP_HINT};
pub use reconciler::{reconcile_round, Reconciliation};
pub use session::{AgentSession, TranscriptEntry};
