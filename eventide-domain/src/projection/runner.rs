//! 投影运行器（ProjectionRunner）
//!
//! 长驻任务：按固定间隔从游标处读取全局日志，逐页分发给读模型，
//! 每页成功后推进游标并通过 `RunnerHandle::position` 对外可见。
//! 分发失败时游标保持不变，下一个周期从同一位置把整页重新分发；
//! 已吸收过这些事件的读模型凭检查点跳过，不会重复折叠。
//!
use super::dispatcher::ReadModelDispatcher;
use crate::error::{DomainError, DomainResult};
use crate::persist::EventStore;
use crate::value_object::GlobalPosition;
use bon::Builder;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 运行器配置
#[derive(Debug, Clone, Copy, Builder, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// 读到日志末尾后的轮询间隔
    #[builder(default = Duration::from_secs(1))]
    pub poll_interval: Duration,
    /// 每页事件数
    #[builder(default = 200)]
    pub page_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            page_size: 200,
        }
    }
}

#[derive(Builder)]
pub struct ProjectionRunner {
    store: EventStore,
    dispatcher: Arc<ReadModelDispatcher>,
    /// 从该位置之后开始读取（不含）
    #[builder(default = GlobalPosition::START)]
    start_from: GlobalPosition,
    #[builder(default)]
    config: RunnerConfig,
}

impl ProjectionRunner {
    /// 启动运行器，返回可用于关闭/等待的句柄
    pub fn start(self: Arc<Self>) -> RunnerHandle {
        let token = CancellationToken::new();
        let (sender, position) = watch::channel(self.start_from);
        let task = tokio::spawn(self.follow(token.clone(), sender));

        RunnerHandle {
            token,
            task: Some(task),
            position,
        }
    }

    async fn follow(
        self: Arc<Self>,
        token: CancellationToken,
        position: watch::Sender<GlobalPosition>,
    ) {
        let mut cursor = self.start_from;
        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.catch_up(&mut cursor, &position, &token).await {
                Ok(()) => {}
                Err(DomainError::Cancelled) => break,
                Err(error) => {
                    warn!(%error, position = %cursor, "projection failed, retrying on next tick");
                }
            }
        }

        debug!(position = %cursor, "projection runner stopped");
    }

    /// 读到日志末尾为止
    async fn catch_up(
        &self,
        cursor: &mut GlobalPosition,
        position: &watch::Sender<GlobalPosition>,
        token: &CancellationToken,
    ) -> DomainResult<()> {
        loop {
            let page = self
                .store
                .load_all_page(*cursor, self.config.page_size, token)
                .await?;

            if !page.events.is_empty() {
                let events = self.dispatcher.codec().project_all(&page.events)?;
                self.dispatcher.dispatch(&events, token).await?;
            }

            if page.next_position != *cursor {
                *cursor = page.next_position;
                position.send_replace(*cursor);
                debug!(position = %cursor, "projection advanced");
            }

            if page.is_end {
                return Ok(());
            }
        }
    }
}

/// 运行器句柄：用于优雅关闭、观察进度与等待任务结束
pub struct RunnerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    position: watch::Receiver<GlobalPosition>,
}

impl RunnerHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// 已分发完成的最后位置
    pub fn position(&self) -> GlobalPosition {
        *self.position.borrow()
    }

    /// 等待游标到达 `target`（含）
    pub async fn wait_until(&self, target: GlobalPosition) -> DomainResult<GlobalPosition> {
        let mut position = self.position.clone();
        let reached = position
            .wait_for(|current| *current >= target)
            .await
            .map_err(|_| DomainError::Cancelled)?;
        Ok(*reached)
    }

    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
