//! 会话监管：每个回合一个 CancellationToken
//!
//! begin_turn 发放新 token，cancel 只作用于当前回合；取消后的下一回合不受影响。

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct SessionSupervisor {
    current: Mutex<CancellationToken>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为新回合创建 token
    pub fn begin_turn(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut current) = self.current.lock() {
            *current = token.clone();
        }
        token
    }

    /// 取消当前回合（用户 Ctrl+C）
    pub fn cancel(&self) {
        if let Ok(current) = self.current.lock() {
            current.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_only_affects_current_turn() {
        let sup = SessionSupervisor::new();
        let first = sup.begin_turn();
        sup.cancel();
        assert!(first.is_cancelled());
        let second = sup.begin_turn();
        assert!(!second.is_cancelled());
    }
}
