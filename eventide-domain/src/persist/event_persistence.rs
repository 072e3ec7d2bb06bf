//! 事件存储后端协议
//!
//! 后端只负责三件事：按期望版本原子追加、按流顺序读取、按全局序号分片读取。
//! 过滤内部流、分页拼装等逻辑由 [`EventStore`](super::EventStore) 完成。
//!
use super::serialized_event::{CommittedEvent, SerializedEvent, StreamId};
use crate::error::DomainResult;
use crate::value_object::{GlobalPosition, Version};
use async_trait::async_trait;
use std::sync::Arc;

/// 单个事件流的一段读取结果
#[derive(Debug, Clone, Default)]
pub struct StreamSlice {
    pub events: Vec<CommittedEvent>,
    /// 该流已无更多事件
    pub is_end: bool,
}

/// 全局日志的一段读取结果（未过滤）
#[derive(Debug, Clone, Default)]
pub struct AllSlice {
    pub events: Vec<CommittedEvent>,
    /// 下一次读取应使用的游标
    pub next_position: GlobalPosition,
    /// 全局日志已无更多事件
    pub is_end: bool,
}

#[async_trait]
pub trait EventPersistence: Send + Sync {
    /// 当且仅当流中已存事件数等于 `expected_version` 时追加整批事件，
    /// 否则返回 `ConcurrencyConflict` 且不写入任何事件
    async fn append(
        &self,
        stream: &StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<Vec<CommittedEvent>>;

    /// 读取聚合序号不小于 `from_sequence_number` 的事件，最多 `max_count` 条
    async fn read_forward(
        &self,
        stream: &StreamId,
        from_sequence_number: usize,
        max_count: usize,
    ) -> DomainResult<StreamSlice>;

    /// 读取全局序号位于 `cursor` 之后的事件，最多 `max_count` 条
    async fn read_all_forward(
        &self,
        cursor: GlobalPosition,
        max_count: usize,
    ) -> DomainResult<AllSlice>;

    /// 当前已存事件数
    async fn stream_version(&self, stream: &StreamId) -> DomainResult<Version>;

    /// 删除整个事件流，已分配的全局序号不再复用
    async fn delete_stream(&self, stream: &StreamId) -> DomainResult<()>;

    /// 是否属于内部流（全局读取时跳过）
    fn is_internal(&self, event: &CommittedEvent) -> bool {
        let _ = event;
        false
    }
}

#[async_trait]
impl<T> EventPersistence for Arc<T>
where
    T: EventPersistence + ?Sized,
{
    async fn append(
        &self,
        stream: &StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<Vec<CommittedEvent>> {
        (**self).append(stream, expected_version, events).await
    }

    async fn read_forward(
        &self,
        stream: &StreamId,
        from_sequence_number: usize,
        max_count: usize,
    ) -> DomainResult<StreamSlice> {
        (**self)
            .read_forward(stream, from_sequence_number, max_count)
            .await
    }

    async fn read_all_forward(
        &self,
        cursor: GlobalPosition,
        max_count: usize,
    ) -> DomainResult<AllSlice> {
        (**self).read_all_forward(cursor, max_count).await
    }

    async fn stream_version(&self, stream: &StreamId) -> DomainResult<Version> {
        (**self).stream_version(stream).await
    }

    async fn delete_stream(&self, stream: &StreamId) -> DomainResult<()> {
        (**self).delete_stream(stream).await
    }

    fn is_internal(&self, event: &CommittedEvent) -> bool {
        (**self).is_internal(event)
    }
}
