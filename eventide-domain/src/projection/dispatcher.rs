//! 读模型分发
//!
//! `ReadModelProjector` 把一批事件定位、分组后交给对应的读模型存储；
//! `ReadModelDispatcher` 把已提交事件并发分发给全部已注册的投影器。
//!
use super::apply::{FoldReadModel, ReadModel, ReadModelApply};
use super::locator::{AggregateIdLocator, ReadModelLocator, group_updates};
use super::store::ReadModelStore;
use crate::domain_event::ProjectedEvent;
use crate::error::DomainResult;
use crate::persist::{CommittedEvent, EventCodec};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

#[async_trait]
pub trait ReadModelDispatch: Send + Sync {
    fn name(&self) -> &str;

    async fn dispatch(
        &self,
        events: &[ProjectedEvent],
        cancel: &CancellationToken,
    ) -> DomainResult<()>;

    /// 删除该读模型的全部实例
    async fn purge(&self) -> DomainResult<()>;
}

pub struct ReadModelProjector<R> {
    name: String,
    store: Arc<ReadModelStore<R>>,
    locator: Arc<dyn ReadModelLocator>,
    applier: Arc<dyn ReadModelApply<R>>,
}

impl<R> ReadModelProjector<R>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        store: Arc<ReadModelStore<R>>,
        locator: Arc<dyn ReadModelLocator>,
        applier: Arc<dyn ReadModelApply<R>>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            locator,
            applier,
        }
    }

    pub fn store(&self) -> &Arc<ReadModelStore<R>> {
        &self.store
    }
}

impl<R: ReadModel> ReadModelProjector<R> {
    /// 每个聚合一个读模型、逐条折叠事件
    pub fn per_aggregate(store: Arc<ReadModelStore<R>>) -> Self {
        Self::new(
            R::NAME,
            store,
            Arc::new(AggregateIdLocator),
            Arc::new(FoldReadModel),
        )
    }
}

#[async_trait]
impl<R> ReadModelDispatch for ReadModelProjector<R>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(projector = %self.name, events = events.len()))]
    async fn dispatch(
        &self,
        events: &[ProjectedEvent],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        let updates = group_updates(self.locator.as_ref(), events);
        if updates.is_empty() {
            return Ok(());
        }
        debug!(read_models = updates.len(), "dispatching to read models");
        self.store
            .update(updates, self.applier.as_ref(), cancel)
            .await
    }

    async fn purge(&self) -> DomainResult<()> {
        self.store.delete_all().await
    }
}

pub struct ReadModelDispatcher {
    codec: EventCodec,
    projectors: Vec<Arc<dyn ReadModelDispatch>>,
}

impl ReadModelDispatcher {
    pub fn new(codec: EventCodec) -> Self {
        Self {
            codec,
            projectors: Vec::new(),
        }
    }

    pub fn register(mut self, projector: Arc<dyn ReadModelDispatch>) -> Self {
        self.projectors.push(projector);
        self
    }

    pub fn codec(&self) -> &EventCodec {
        &self.codec
    }

    pub fn projectors(&self) -> &[Arc<dyn ReadModelDispatch>] {
        &self.projectors
    }

    /// 并发分发给全部投影器，任一失败即返回该错误
    pub async fn dispatch(
        &self,
        events: &[ProjectedEvent],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        if events.is_empty() || self.projectors.is_empty() {
            return Ok(());
        }
        try_join_all(
            self.projectors
                .iter()
                .map(|projector| projector.dispatch(events, cancel)),
        )
        .await?;
        Ok(())
    }

    /// 解码、升级已提交事件后分发
    pub async fn dispatch_committed(
        &self,
        committed: &[CommittedEvent],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        if committed.is_empty() || self.projectors.is_empty() {
            return Ok(());
        }
        let events = self.codec.project_all(committed)?;
        self.dispatch(&events, cancel).await
    }
}

impl std::fmt::Debug for ReadModelDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.projectors.iter().map(|p| p.name()).collect();
        f.debug_struct("ReadModelDispatcher")
            .field("projectors", &names)
            .finish()
    }
}
