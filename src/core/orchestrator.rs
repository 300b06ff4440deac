//! Agent 编排器：主控任务
//!
//! 负责：加载配置、装配组件、建立 cmd/state/event 三通道，
//! 并在后台任务中消费用户命令（Submit/Cancel/Clear/Quit）。
//! 每个回合在独立任务中运行，命令循环因此能在回合进行中处理 Cancel。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::agent::{AgentEvent, AgentSession, TranscriptEntry};
use crate::config::{load_config, AppConfig};
use crate::core::builder::AgentBuilder;
use crate::core::{AgentPhase, SessionSupervisor, UiState};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交用户输入，触发一次回合
    Submit(String),
    /// 取消当前回合（Stop generating）
    Cancel,
    /// 清空会话（对话、分类表、缓存、可见记录）
    Clear,
    /// 退出应用
    Quit,
}

/// 编排器通道
pub struct AgentHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub state: watch::Receiver<UiState>,
    pub events: mpsc::UnboundedReceiver<AgentEvent>,
}

/// 加载配置并创建编排器
pub async fn create_agent(config_path: Option<PathBuf>) -> anyhow::Result<AgentHandle> {
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let parts = AgentBuilder::new(cfg).build()?;
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let session = AgentSession::new(parts.model, parts.dispatcher).with_events(event_tx);
    Ok(spawn_orchestrator(session, event_rx))
}

/// 以给定会话启动命令循环
pub fn spawn_orchestrator(
    session: AgentSession,
    events: mpsc::UnboundedReceiver<AgentEvent>,
) -> AgentHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (state_tx, state_rx) = watch::channel(UiState::project(&session, AgentPhase::Idle, None));
    let state_tx = Arc::new(state_tx);
    let session = Arc::new(Mutex::new(session));
    let supervisor = Arc::new(SessionSupervisor::new());

    tokio::spawn(async move {
        let mut turn: Option<JoinHandle<()>> = None;
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Submit(input) => {
                    if turn.as_ref().is_some_and(|h| !h.is_finished()) {
                        tracing::warn!("turn already running, input ignored");
                        continue;
                    }
                    let token = supervisor.begin_turn();
                    state_tx.send_modify(|s| {
                        s.phase = AgentPhase::Thinking;
                        s.transcript.push(TranscriptEntry::User(input.clone()));
                        s.input_locked = true;
                        s.error_message = None;
                    });
                    let session = Arc::clone(&session);
                    let state_tx = Arc::clone(&state_tx);
                    turn = Some(tokio::spawn(async move {
                        let mut session = session.lock().await;
                        let result = session.submit(&input, token).await;
                        let (phase, error) = match result {
                            Ok(_) => (AgentPhase::Idle, None),
                            Err(e) if e.is_cancelled() => (AgentPhase::Idle, None),
                            Err(e) => (AgentPhase::Error, Some(e.to_string())),
                        };
                        let _ = state_tx.send(UiState::project(&session, phase, error));
                    }));
                }
                Command::Cancel => supervisor.cancel(),
                Command::Clear => {
                    supervisor.cancel();
                    if let Some(handle) = turn.take() {
                        let _ = handle.await;
                    }
                    let mut session = session.lock().await;
                    session.reset();
                    let _ = state_tx.send(UiState::project(&session, AgentPhase::Idle, None));
                }
                Command::Quit => {
                    supervisor.cancel();
                    break;
                }
            }
        }
    });

    AgentHandle {
        commands: cmd_tx,
        state: state_rx,
        events,
    }
}
