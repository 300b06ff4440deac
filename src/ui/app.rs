//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state 与终端事件，将用户输入与快捷键转为 Command 发送给编排器；
//! 编排事件只用于标题栏的进度提示。每帧用 draw 渲染 UiState 与输入缓冲。

use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::agent::AgentEvent;
use crate::core::{AgentHandle, Command};
use crate::ui::event::{AppEvent, EventHandler};
use crate::ui::render::draw;

/// 编排事件 -> 标题栏进度文本；None 表示保持原样
fn progress_text(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::Round { round, max_rounds } => Some(format!("第 {round}/{max_rounds} 轮")),
        AgentEvent::Thinking => Some("思考中…".to_string()),
        AgentEvent::ToolCall { tool, .. } => Some(format!("执行: {tool}")),
        AgentEvent::WrapUp { remaining } => Some(format!("收尾中（剩余 {remaining} 轮）")),
        AgentEvent::CategorySaved { label, .. } => Some(format!("已保存分类: {label}")),
        AgentEvent::CategoryUnresolved { label } => Some(format!("分类未匹配: {label}")),
        _ => None,
    }
}

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(handle: AgentHandle) -> anyhow::Result<()> {
    let AgentHandle {
        commands,
        state: state_rx,
        mut events,
    } = handle;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = EventHandler::new(commands);
    let mut input_buffer = String::new();
    let mut conversation_scroll = 0usize;
    let mut last_transcript_len = 0usize;
    let mut progress: Option<String> = None;

    loop {
        while let Ok(ev) = events.try_recv() {
            if let Some(text) = progress_text(&ev) {
                progress = Some(text);
            }
        }
        let state = state_rx.borrow().clone();
        if !state.input_locked {
            progress = None;
        }
        if state.transcript.len() != last_transcript_len {
            last_transcript_len = state.transcript.len();
            conversation_scroll = usize::MAX;
        }

        if let Some(ev) = event_handler.poll()? {
            match ev {
                AppEvent::Command(Command::Quit) => break,
                AppEvent::Command(_) => {}
                AppEvent::Resize(_, _) => {
                    terminal.autoresize()?;
                    conversation_scroll = usize::MAX;
                }
                AppEvent::Key(key) => match key.code {
                    KeyCode::Enter if !state.input_locked => {
                        let input = input_buffer.trim().to_string();
                        input_buffer.clear();
                        if !input.is_empty() {
                            if matches!(input.to_lowercase().as_str(), "/exit" | "exit" | "/quit" | "quit") {
                                break;
                            }
                            event_handler.send_submit(input);
                        }
                    }
                    KeyCode::Backspace => {
                        input_buffer.pop();
                    }
                    KeyCode::Char(c) => input_buffer.push(c),
                    KeyCode::Up => conversation_scroll = conversation_scroll.saturating_sub(1),
                    KeyCode::Down => conversation_scroll = conversation_scroll.saturating_add(1),
                    KeyCode::PageUp => conversation_scroll = conversation_scroll.saturating_sub(10),
                    KeyCode::PageDown => conversation_scroll = conversation_scroll.saturating_add(10),
                    KeyCode::Home => conversation_scroll = 0,
                    KeyCode::End => conversation_scroll = usize::MAX,
                    _ => {}
                },
            }
        }

        let mut scroll_info = (0usize, 0usize);
        terminal.draw(|f| {
            draw(
                f,
                &state,
                &input_buffer,
                progress.as_deref(),
                conversation_scroll,
                &mut scroll_info,
            );
        })?;
        let (total_lines, viewport_height) = scroll_info;
        conversation_scroll = conversation_scroll.min(total_lines.saturating_sub(viewport_height));

        tokio::task::yield_now().await;
    }

    restore_terminal(&mut terminal)?;
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_text() {
        assert_eq!(
            progress_text(&AgentEvent::Round { round: 3, max_rounds: 30 }).as_deref(),
            Some("第 3/30 轮")
        );
        assert!(progress_text(&AgentEvent::Response { text: "x".into() }).is_none());
    }
}
