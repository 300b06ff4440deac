//! 核心编排层：错误、组件装配、状态投影、会话监管、主控任务

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod session_supervisor;
pub mod state;

pub use builder::{AgentBuilder, AgentComponents};
pub use error::AgentError;
pub use orchestrator::{create_agent, spawn_orchestrator, AgentHandle, Command};
pub use session_supervisor::SessionSupervisor;
pub use state::{AgentPhase, UiState};
