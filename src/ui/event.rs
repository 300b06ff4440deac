//! 事件处理
//!
//! 轮询 crossterm 事件，将 Ctrl+C/Esc、Ctrl+L、Ctrl+Q 转为 Command（Cancel/Clear/Quit），
//! 窗口尺寸变化转为 Resize，其余按键交给 run_app 拼 input_buffer，Enter 时 send_submit。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::Command;

/// 应用事件：来自快捷键的 Command、原始 KeyEvent 或窗口尺寸变化
#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Key(KeyEvent),
    Resize(u16, u16),
}

/// 事件处理器：持有 cmd_tx，poll 时读终端事件并返回 AppEvent
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<AppEvent>> {
        if event::poll(std::time::Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(Some(self.handle_key(key)));
                }
                Event::Resize(w, h) => return Ok(Some(AppEvent::Resize(w, h))),
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: KeyEvent) -> AppEvent {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let cmd = match key.code {
            KeyCode::Char('c') if ctrl => Command::Cancel,
            KeyCode::Esc => Command::Cancel,
            KeyCode::Char('l') if ctrl => Command::Clear,
            KeyCode::Char('q') if ctrl => Command::Quit,
            _ => return AppEvent::Key(key),
        };
        let _ = self.cmd_tx.send(cmd.clone());
        AppEvent::Command(cmd)
    }

    pub fn send_submit(&self, input: String) {
        let _ = self.cmd_tx.send(Command::Submit(input));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts_forward_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handler = EventHandler::new(tx);
        let ev = handler.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert!(matches!(ev, AppEvent::Command(Command::Clear)));
        assert!(matches!(rx.try_recv(), Ok(Command::Clear)));

        let ev = handler.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE));
        assert!(matches!(ev, AppEvent::Key(_)));
        assert!(rx.try_recv().is_err());
    }
}
