//! 聚合仓储组合实现
//!
//! 基于事件存储与快照的通用聚合仓储实现：
//! - `EventSourcedRepository`：从第一条事件开始回放；
//! - `SnapshottingRepository`：先恢复最近快照，再回放快照之后的事件，
//!   提交后按策略落盘新快照。
//!
use super::codec::EventCodec;
use super::event_store::EventStore;
use super::serialized_event::{CommittedEvent, StreamId};
use super::snapshot_repository::{SnapshotPersistence, SnapshotPolicy};
use crate::aggregate::{Aggregate, SnapshotAggregate, apply_committed};
use crate::domain_event::EventContext;
use crate::error::{DomainError, DomainResult};
use crate::value_object::Version;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[async_trait]
pub trait AggregateRepository<A>: Send + Sync
where
    A: Aggregate,
{
    /// 加载聚合；不存在时返回版本为 0 的空聚合
    async fn load(&self, aggregate_id: &A::Id) -> Result<A, A::Error>;

    /// 以聚合当前版本为期望版本提交新事件，成功后把事件应用到聚合
    async fn commit(
        &self,
        aggregate: &mut A,
        events: Vec<A::Event>,
        context: &EventContext,
    ) -> Result<Vec<CommittedEvent>, A::Error>;

    /// 删除聚合的事件流及其快照
    async fn delete(&self, aggregate_id: &A::Id) -> Result<(), A::Error>;
}

#[async_trait]
impl<A, T> AggregateRepository<A> for Arc<T>
where
    A: Aggregate,
    T: AggregateRepository<A> + ?Sized,
{
    async fn load(&self, aggregate_id: &A::Id) -> Result<A, A::Error> {
        (**self).load(aggregate_id).await
    }

    async fn commit(
        &self,
        aggregate: &mut A,
        events: Vec<A::Event>,
        context: &EventContext,
    ) -> Result<Vec<CommittedEvent>, A::Error> {
        (**self).commit(aggregate, events, context).await
    }

    async fn delete(&self, aggregate_id: &A::Id) -> Result<(), A::Error> {
        (**self).delete(aggregate_id).await
    }
}

/// 基于事件存储的聚合仓储
pub struct EventSourcedRepository<A> {
    store: EventStore,
    codec: EventCodec,
    _marker: PhantomData<fn() -> A>,
}

impl<A> Clone for EventSourcedRepository<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A: Aggregate> EventSourcedRepository<A> {
    pub fn new(store: EventStore, codec: EventCodec) -> Self {
        Self {
            store,
            codec,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn codec(&self) -> &EventCodec {
        &self.codec
    }

    /// 回放聚合当前版本之后的全部事件
    pub async fn replay(&self, mut aggregate: A) -> DomainResult<A> {
        let stream = StreamId::of::<A>(aggregate.id());
        let events = self
            .store
            .load_from(&stream, aggregate.version().value() + 1)
            .await?;

        for committed in &events {
            let expected = aggregate.version().next();
            if committed.aggregate_sequence_number() != expected.value() {
                return Err(DomainError::InvalidState {
                    reason: format!(
                        "stream {stream} has a gap: expected sequence {}, found {}",
                        expected.value(),
                        committed.aggregate_sequence_number()
                    ),
                });
            }
            let event = self.codec.decode_event::<A>(committed)?;
            apply_committed(&mut aggregate, &event);
        }

        debug!(%stream, replayed = events.len(), version = %aggregate.version(), "aggregate replayed");
        Ok(aggregate)
    }

    /// 提交事件，成功后应用到聚合
    pub async fn append(
        &self,
        aggregate: &mut A,
        events: Vec<A::Event>,
        context: &EventContext,
    ) -> DomainResult<Vec<CommittedEvent>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let stream = StreamId::of::<A>(aggregate.id());
        let serialized =
            self.codec
                .encode_events::<A>(aggregate.id(), aggregate.version(), &events, context)?;
        let committed = self.store.append(&stream, serialized).await?;

        for event in &events {
            apply_committed(aggregate, event);
        }
        Ok(committed)
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for EventSourcedRepository<A>
where
    A: Aggregate,
{
    #[instrument(skip_all, fields(aggregate = A::TYPE, id = %aggregate_id))]
    async fn load(&self, aggregate_id: &A::Id) -> Result<A, A::Error> {
        Ok(self
            .replay(A::new(aggregate_id.clone(), Version::new()))
            .await?)
    }

    #[instrument(skip_all, fields(aggregate = A::TYPE, id = %aggregate.id(), version = %aggregate.version()))]
    async fn commit(
        &self,
        aggregate: &mut A,
        events: Vec<A::Event>,
        context: &EventContext,
    ) -> Result<Vec<CommittedEvent>, A::Error> {
        Ok(self.append(aggregate, events, context).await?)
    }

    async fn delete(&self, aggregate_id: &A::Id) -> Result<(), A::Error> {
        let stream = StreamId::of::<A>(aggregate_id);
        Ok(self.store.delete_stream(&stream).await?)
    }
}

/// 基于事件存储 + 快照的聚合仓储
pub struct SnapshottingRepository<A> {
    events: EventSourcedRepository<A>,
    snapshots: Arc<dyn SnapshotPersistence>,
    policy: SnapshotPolicy,
}

impl<A: SnapshotAggregate> SnapshottingRepository<A> {
    pub fn new(
        events: EventSourcedRepository<A>,
        snapshots: Arc<dyn SnapshotPersistence>,
        policy: SnapshotPolicy,
    ) -> Self {
        Self {
            events,
            snapshots,
            policy,
        }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    /// 从最近快照恢复聚合（不回放事件），无快照时返回空聚合
    async fn restore(&self, aggregate_id: &A::Id) -> DomainResult<A> {
        let stream = StreamId::of::<A>(aggregate_id);
        let Some(snapshot) = self.snapshots.get_latest(&stream).await? else {
            return Ok(A::new(aggregate_id.clone(), Version::new()));
        };

        let container = self.events.codec().decode_snapshot::<A>(&snapshot)?;
        let version = Version::from_value(container.metadata.aggregate_sequence_number());
        let mut aggregate = A::new(aggregate_id.clone(), version);
        aggregate.restore(container.payload);
        aggregate.set_version(version);

        debug!(%stream, %version, "aggregate restored from snapshot");
        Ok(aggregate)
    }

    async fn store_snapshot(&self, aggregate: &A) -> DomainResult<()> {
        let stream = StreamId::of::<A>(aggregate.id());
        let snapshot = self.events.codec().encode_snapshot(aggregate)?;
        self.snapshots.put(&stream, snapshot).await?;
        debug!(%stream, version = %aggregate.version(), "snapshot stored");
        Ok(())
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for SnapshottingRepository<A>
where
    A: SnapshotAggregate,
{
    #[instrument(skip_all, fields(aggregate = A::TYPE, id = %aggregate_id))]
    async fn load(&self, aggregate_id: &A::Id) -> Result<A, A::Error> {
        let aggregate = self.restore(aggregate_id).await?;
        Ok(self.events.replay(aggregate).await?)
    }

    #[instrument(skip_all, fields(aggregate = A::TYPE, id = %aggregate.id(), version = %aggregate.version()))]
    async fn commit(
        &self,
        aggregate: &mut A,
        events: Vec<A::Event>,
        context: &EventContext,
    ) -> Result<Vec<CommittedEvent>, A::Error> {
        let before = aggregate.version();
        let committed = self.events.append(aggregate, events, context).await?;

        if self.policy.should_snapshot(before, aggregate.version()) {
            if let Err(error) = self.store_snapshot(aggregate).await {
                warn!(%error, "failed to store snapshot, commit is unaffected");
            }
        }
        Ok(committed)
    }

    async fn delete(&self, aggregate_id: &A::Id) -> Result<(), A::Error> {
        let stream = StreamId::of::<A>(aggregate_id);
        self.events.store().delete_stream(&stream).await?;
        self.snapshots.delete(&stream).await?;
        Ok(())
    }
}
