//! 持久化与事件溯源（persist）
//!
//! 定义事件存储、快照存储及其通用组合实现，支持：
//! - 带乐观并发控制的追加、按流读取与全局日志分页（`EventStore`）；
//! - 快照读写与策略（`SnapshotPersistence`/`SnapshotPolicy`）；
//! - 事件与快照的版本化编解码（`EventCodec`）；
//! - 纯事件或事件+快照的聚合仓储实现（`EventSourcedRepository`、`SnapshottingRepository`）。
//!
//! 该模块聚焦协议与装配逻辑，内存后端作为参考实现，具体存储后端由上层实现并注入。
//!
mod aggregate_repository;
mod codec;
mod event_persistence;
mod event_store;
mod inmemory_events;
mod serialized_event;
mod serialized_snapshot;
mod snapshot_repository;

pub use aggregate_repository::{
    AggregateRepository, EventSourcedRepository, SnapshottingRepository,
};
pub use codec::EventCodec;
pub use event_persistence::{AllSlice, EventPersistence, StreamSlice};
pub use event_store::{AllEventsPage, EventStore, EventStoreConfig};
pub use inmemory_events::InMemoryEventPersistence;
pub use serialized_event::{CommittedEvent, SerializedEvent, StreamId};
pub use serialized_snapshot::{SerializedSnapshot, SnapshotContainer, SnapshotMetadata};
pub use snapshot_repository::{InMemorySnapshotPersistence, SnapshotPersistence, SnapshotPolicy};
