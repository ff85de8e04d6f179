//! 会话监管：取消令牌的生命周期
//!
//! 每次规划会话（一次 start / ideas 流程）拿到一个子 token；Ctrl+C 时取消当前会话，
//! 若没有活动会话则取消根 token，由 REPL 退出。

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// 会话级生命周期管理：根 token + 当前会话 token
#[derive(Debug, Clone)]
pub struct SessionSupervisor {
    root: CancellationToken,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// 根 token：被取消表示整个进程应当退出
    pub fn root_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// 开始一个新会话，返回其取消 token（根 token 的子 token）
    pub fn begin(&self) -> CancellationToken {
        let token = self.root.child_token();
        if let Ok(mut current) = self.current.lock() {
            *current = Some(token.clone());
        }
        token
    }

    /// 会话结束（正常完成或出错）
    pub fn end(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    /// 取消当前会话；没有活动会话时取消根 token
    pub fn interrupt(&self) {
        let active = self.current.lock().ok().and_then(|c| c.clone());
        match active {
            Some(token) if !token.is_cancelled() => {
                tracing::info!("Cancelling current planning session");
                token.cancel();
            }
            _ => {
                tracing::info!("No active session, shutting down");
                self.root.cancel();
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }

    /// 后台监听 Ctrl+C，转为 interrupt()
    pub fn watch_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                supervisor.interrupt();
                if supervisor.is_shutdown() {
                    break;
                }
            }
        })
    }
}

impl Default for SessionSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_cancels_active_session_only() {
        let supervisor = SessionSupervisor::new();
        let token = supervisor.begin();
        supervisor.interrupt();
        assert!(token.is_cancelled());
        assert!(!supervisor.is_shutdown());
    }

    #[test]
    fn test_interrupt_without_session_shuts_down() {
        let supervisor = SessionSupervisor::new();
        let token = supervisor.begin();
        supervisor.end();
        supervisor.interrupt();
        assert!(supervisor.is_shutdown());
        // 子 token 随根 token 一起取消
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_new_session_after_cancel_is_fresh() {
        let supervisor = SessionSupervisor::new();
        let first = supervisor.begin();
        supervisor.interrupt();
        supervisor.end();
        let second = supervisor.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }
}
