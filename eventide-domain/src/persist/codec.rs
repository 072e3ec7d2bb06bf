//! 事件与快照的编解码
//!
//! 写入时按载荷类型在注册表中取得 `(名称, 版本)` 并序列化；读取时按标签
//! 反序列化为当时的具体类型，再沿升级链转换到最新版本。
//!
use super::serialized_event::{CommittedEvent, SerializedEvent};
use super::serialized_snapshot::{SerializedSnapshot, SnapshotContainer, SnapshotMetadata};
use crate::aggregate::{Aggregate, SnapshotAggregate};
use crate::domain_event::{DomainEvent, EventContext, EventMetadata, ProjectedEvent};
use crate::error::{DomainError, DomainResult};
use crate::value_object::Version;
use crate::versioned::{VersionedTypeRegistry, VersionedTypeUpgrader};
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EventCodec {
    upgrader: Arc<VersionedTypeUpgrader>,
}

impl EventCodec {
    pub fn new(upgrader: Arc<VersionedTypeUpgrader>) -> Self {
        Self { upgrader }
    }

    pub fn types(&self) -> &VersionedTypeRegistry {
        self.upgrader.types()
    }

    pub fn upgrader(&self) -> &VersionedTypeUpgrader {
        &self.upgrader
    }

    /// 将新事件编码为从 `current` 之后连续编号的落盘事件
    pub fn encode_events<A: Aggregate>(
        &self,
        id: &A::Id,
        current: Version,
        events: &[A::Event],
        context: &EventContext,
    ) -> DomainResult<Vec<SerializedEvent>> {
        let aggregate_id = id.to_string();
        let timestamp = Utc::now();

        events
            .iter()
            .enumerate()
            .map(|(offset, event)| {
                let payload = event.payload();
                let definition = self.types().definition_for(payload)?;
                let metadata = EventMetadata::new(A::TYPE, context);
                Ok::<_, DomainError>(SerializedEvent::builder()
                    .aggregate_id(aggregate_id.as_str())
                    .aggregate_type(A::TYPE)
                    .aggregate_sequence_number(current.value() + offset + 1)
                    .event_type_name(definition.name())
                    .event_type_version(definition.version())
                    .timestamp(timestamp)
                    .data(payload.to_value()?)
                    .metadata(serde_json::to_value(&metadata)?)
                    .build())
            })
            .collect()
    }

    /// 解码并升级一条落盘事件，还原为聚合事件
    pub fn decode_event<A: Aggregate>(&self, event: &SerializedEvent) -> DomainResult<A::Event> {
        let payload = self.upgrader.decode(
            event.event_type_name(),
            event.event_type_version(),
            event.data().clone(),
        )?;
        A::Event::from_payload(payload)
    }

    /// 解码并升级一条已提交事件，供读模型使用
    pub fn project(&self, committed: &CommittedEvent) -> DomainResult<ProjectedEvent> {
        let payload = self.upgrader.decode(
            committed.event_type_name(),
            committed.event_type_version(),
            committed.data().clone(),
        )?;
        let metadata: EventMetadata = serde_json::from_value(committed.metadata().clone())?;

        Ok(ProjectedEvent::builder()
            .aggregate_type(committed.aggregate_type())
            .aggregate_id(committed.aggregate_id())
            .aggregate_sequence_number(committed.aggregate_sequence_number())
            .global_sequence_number(committed.global_sequence_number())
            .event_type_name(committed.event_type_name())
            .event_type_version(committed.event_type_version())
            .timestamp(committed.timestamp())
            .metadata(metadata)
            .payload(Arc::from(payload))
            .build())
    }

    pub fn project_all(&self, committed: &[CommittedEvent]) -> DomainResult<Vec<ProjectedEvent>> {
        committed.iter().map(|event| self.project(event)).collect()
    }

    /// 为聚合当前状态生成落盘快照
    pub fn encode_snapshot<A: SnapshotAggregate>(
        &self,
        aggregate: &A,
    ) -> DomainResult<SerializedSnapshot> {
        let snapshot = aggregate.create_snapshot();
        let definition = self.types().definition_of::<A::Snapshot>()?;
        let metadata = SnapshotMetadata::builder()
            .aggregate_id(aggregate.id().to_string())
            .aggregate_name(A::TYPE)
            .aggregate_sequence_number(aggregate.version().value())
            .snapshot_name(definition.name())
            .snapshot_version(definition.version())
            .build();
        Ok(SerializedSnapshot::new(
            metadata,
            serde_json::to_value(&snapshot)?,
        ))
    }

    /// 解码快照并升级到聚合当前的快照类型
    pub fn decode_snapshot<A: SnapshotAggregate>(
        &self,
        snapshot: &SerializedSnapshot,
    ) -> DomainResult<SnapshotContainer<A::Snapshot>> {
        let metadata = snapshot.metadata();
        if metadata.aggregate_name() != A::TYPE {
            return Err(DomainError::TypeMismatch {
                expected: A::TYPE.to_string(),
                found: metadata.aggregate_name().to_string(),
            });
        }

        let payload = self.types().decode(
            metadata.snapshot_name(),
            metadata.snapshot_version(),
            snapshot.data().clone(),
        )?;
        Ok(SnapshotContainer {
            payload: self.upgrader.upgrade_as::<A::Snapshot>(payload)?,
            metadata: metadata.clone(),
        })
    }
}
