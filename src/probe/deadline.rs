//! 截止时间
//!
//! 一个计时任务在预算耗尽后翻转取消信号。`Deadline` 持有该任务，
//! 清除或析构时终止任务，之后信号不会再触发。

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// 单次探测独占的截止时间
#[derive(Debug)]
pub struct Deadline {
    budget: Duration,
    signal: watch::Receiver<bool>,
    timer: JoinHandle<()>,
}

impl Deadline {
    /// 启动计时
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn arm(budget: Duration) -> Self {
        let (trigger, signal) = watch::channel(false);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            let _ = trigger.send(true);
            trace!("截止时间触发: {:?}", budget);
        });

        Self {
            budget,
            signal,
            timer,
        }
    }

    /// 预算
    #[cfg(test)]
    fn budget(&self) -> Duration {
        self.budget
    }

    /// 信号是否已触发
    #[cfg(test)]
    fn is_expired(&self) -> bool {
        *self.signal.borrow()
    }

    /// 订阅取消信号
    ///
    /// 计时任务被清除后，订阅者的 `changed()` 返回错误，值保持 `false`。
    #[cfg(test)]
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.clone()
    }

    /// 等待信号触发
    pub async fn expired(&mut self) {
        let released = self.signal.wait_for(|fired| *fired).await.is_err();
        if released {
            // 计时任务已被终止，信号不会再来
            std::future::pending::<()>().await;
        }
    }

    /// 清除计时
    pub fn clear(self) {
        trace!("清除截止时间: {:?}", self.budget);
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Instant};

    #[tokio::test]
    async fn test_deadline_fires_after_budget() {
        let start = Instant::now();
        let mut deadline = Deadline::arm(Duration::from_millis(50));
        assert!(!deadline.is_expired());

        deadline.expired().await;

        assert!(deadline.is_expired());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_cleared_deadline_never_fires() {
        let deadline = Deadline::arm(Duration::from_millis(30));
        let mut signal = deadline.subscribe();

        deadline.clear();
        sleep(Duration::from_millis(80)).await;

        assert!(!*signal.borrow());
        // 计时任务已释放，发送端随之关闭
        assert!(signal.changed().await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_deadline_releases_timer() {
        let mut signal = {
            let deadline = Deadline::arm(Duration::from_millis(30));
            deadline.subscribe()
        };

        let closed = timeout(Duration::from_secs(1), signal.changed()).await;
        assert!(matches!(closed, Ok(Err(_))));
        assert!(!*signal.borrow());
    }

    #[tokio::test]
    async fn test_expired_waits_while_armed() {
        let mut deadline = Deadline::arm(Duration::from_secs(5));
        assert_eq!(deadline.budget(), Duration::from_secs(5));

        let waited = timeout(Duration::from_millis(50), deadline.expired()).await;
        assert!(waited.is_err());
    }
}
