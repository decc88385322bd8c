//! 优雅退出管理模块
//!
//! 提供跨平台的信号处理和优雅退出协调机制，
//! 支持 SIGINT、SIGTERM 信号和 Windows Ctrl+C 处理。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info};

/// 优雅退出管理器
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    /// 退出信号通知器
    notify: Notify,
    /// 最近一次退出原因
    last_reason: std::sync::Mutex<Option<ShutdownReason>>,
    /// 是否已经开始优雅退出
    shutting_down: AtomicBool,
}

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

impl ShutdownManager {
    /// 创建新的优雅退出管理器
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                notify: Notify::new(),
                last_reason: std::sync::Mutex::new(None),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// 是否已经触发退出
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// 触发退出
    pub fn trigger(&self, reason: ShutdownReason) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut guard) = self.inner.last_reason.lock() {
            *guard = Some(reason);
        }
        info!("触发优雅退出: {:?}", reason);
        self.inner.notify.notify_waiters();
    }

    /// 等待退出信号，返回退出原因
    pub async fn wait_for_shutdown(&self) -> ShutdownReason {
        debug!("等待退出信号...");
        if !self.is_shutting_down() {
            self.inner.notify.notified().await;
        }
        self.inner
            .last_reason
            .lock()
            .ok()
            .and_then(|g| *g)
            .unwrap_or(ShutdownReason::Application)
    }

    /// 启动系统信号监听任务（SIGINT/SIGTERM，Windows 下仅 Ctrl+C）
    pub fn start_signal_handler(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{SignalKind, signal};
                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!("注册 SIGTERM 处理失败: {}", e);
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => manager.trigger(ShutdownReason::Interrupt),
                    _ = sigterm.recv() => manager.trigger(ShutdownReason::Terminate),
                }
            }
            #[cfg(not(unix))]
            {
                if tokio::signal::ctrl_c().await.is_ok() {
                    manager.trigger(ShutdownReason::Interrupt);
                }
            }
        });
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{ShutdownManager, ShutdownReason};

    #[tokio::test]
    async fn trigger_wakes_waiters_with_reason() {
        let manager = ShutdownManager::new();
        let waiter = manager.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_shutdown().await });

        // 给等待方让出执行机会后再触发。
        tokio::task::yield_now().await;
        manager.trigger(ShutdownReason::Terminate);

        let reason = handle.await.expect("join waiter");
        assert_eq!(reason, ShutdownReason::Terminate);
        assert!(manager.is_shutting_down());
    }

    #[tokio::test]
    async fn second_trigger_is_ignored() {
        let manager = ShutdownManager::new();
        manager.trigger(ShutdownReason::Interrupt);
        manager.trigger(ShutdownReason::Terminate);
        assert_eq!(
            manager.wait_for_shutdown().await,
            ShutdownReason::Interrupt
        );
    }
}
