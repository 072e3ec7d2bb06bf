//! 聚合根编排器（AggregateRoot）
//!
//! 封装从“加载聚合 → 执行命令 → 提交事件 → 分发读模型”的标准流程，
//! 以仓储实现（`AggregateRepository`）为依赖，便于在应用层直接调用。
//! 提交遇到并发冲突时按重试策略重新加载聚合并重新执行命令。
//!
use crate::{
    aggregate::Aggregate,
    domain_event::EventContext,
    persist::{AggregateRepository, CommittedEvent},
    projection::ReadModelDispatcher,
    retry::{ConcurrencyConflictRetry, RetryStrategy, retry},
};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// 面向应用层的聚合根编排器。
///
/// - `A`：聚合类型（实现 `Aggregate`）
/// - `R`：聚合仓储（实现 `AggregateRepository<A>`）
pub struct AggregateRoot<A, R>
where
    A: Aggregate,
    R: AggregateRepository<A>,
{
    repo: R,
    dispatcher: Option<Arc<ReadModelDispatcher>>,
    retry: Arc<dyn RetryStrategy>,
    cancel: CancellationToken,
    _marker: PhantomData<fn() -> A>,
}

impl<A, R> AggregateRoot<A, R>
where
    A: Aggregate,
    R: AggregateRepository<A>,
{
    /// 创建编排器实例
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            dispatcher: None,
            retry: Arc::new(ConcurrencyConflictRetry::default()),
            cancel: CancellationToken::new(),
            _marker: PhantomData,
        }
    }

    /// 提交成功后把事件分发给读模型
    pub fn with_dispatcher(mut self, dispatcher: Arc<ReadModelDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_retry(mut self, retry: Arc<dyn RetryStrategy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 执行聚合命令：
    /// 1. 加载聚合（不存在时为空聚合）；
    /// 2. 执行命令得到新事件；
    /// 3. 以加载时的版本提交，成功后事件已应用到聚合；
    /// 4. 分发已提交事件给读模型。
    ///
    /// 读模型分发失败时事件已经提交，错误仍会返回给调用方。
    #[instrument(skip_all, fields(aggregate = A::TYPE, id = %aggregate_id))]
    pub async fn execute(
        &self,
        aggregate_id: &A::Id,
        command: A::Command,
        context: &EventContext,
    ) -> Result<Vec<CommittedEvent>, A::Error>
    where
        A::Command: Clone,
    {
        let repo = &self.repo;

        let committed = retry(self.retry.as_ref(), &self.cancel, move || {
            let command = command.clone();
            async move {
                let mut aggregate = repo.load(aggregate_id).await?;
                let events = aggregate.execute(command)?;
                repo.commit(&mut aggregate, events, context).await
            }
        })
        .await?;

        if let Some(dispatcher) = &self.dispatcher {
            dispatcher
                .dispatch_committed(&committed, &self.cancel)
                .await?;
        }

        Ok(committed)
    }

    /// 加载聚合的当前状态
    pub async fn load(&self, aggregate_id: &A::Id) -> Result<A, A::Error> {
        self.repo.load(aggregate_id).await
    }

    /// 删除聚合的事件流与快照
    pub async fn delete(&self, aggregate_id: &A::Id) -> Result<(), A::Error> {
        self.repo.delete(aggregate_id).await
    }
}
