//! 内存事件存储后端
//!
//! 作为测试替身与各后端的参考语义：单把读写锁保护全局计数器、各流日志与全局日志，
//! 追加时在锁内完成期望版本校验与序号分配。聚合类型以 `$` 开头的流视为内部流。
//!
use super::event_persistence::{AllSlice, EventPersistence, StreamSlice};
use super::serialized_event::{CommittedEvent, SerializedEvent, StreamId};
use crate::error::{DomainError, DomainResult};
use crate::value_object::{GlobalPosition, Version};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Inner {
    last_global: u64,
    streams: HashMap<StreamId, Vec<CommittedEvent>>,
    /// 按全局序号升序
    log: Vec<CommittedEvent>,
}

#[derive(Debug, Default)]
pub struct InMemoryEventPersistence {
    inner: RwLock<Inner>,
}

impl InMemoryEventPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全局日志中的事件数（含内部流）
    pub async fn len(&self) -> usize {
        self.inner.read().await.log.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.log.is_empty()
    }
}

#[async_trait]
impl EventPersistence for InMemoryEventPersistence {
    async fn append(
        &self,
        stream: &StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<Vec<CommittedEvent>> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let actual = inner.streams.get(stream).map_or(0, Vec::len);
        if actual != expected_version.value() {
            return Err(DomainError::ConcurrencyConflict {
                stream: stream.to_string(),
                expected: expected_version.value(),
                actual,
            });
        }

        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            inner.last_global += 1;
            committed.push(CommittedEvent::new(inner.last_global, event));
        }

        inner
            .streams
            .entry(stream.clone())
            .or_default()
            .extend(committed.iter().cloned());
        inner.log.extend(committed.iter().cloned());

        debug!(%stream, count = committed.len(), last_global = inner.last_global, "events appended");
        Ok(committed)
    }

    async fn read_forward(
        &self,
        stream: &StreamId,
        from_sequence_number: usize,
        max_count: usize,
    ) -> DomainResult<StreamSlice> {
        let inner = self.inner.read().await;
        let Some(events) = inner.streams.get(stream) else {
            return Ok(StreamSlice {
                events: Vec::new(),
                is_end: true,
            });
        };

        let start = from_sequence_number.max(1) - 1;
        let end = start.saturating_add(max_count).min(events.len());
        let slice = events.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
        Ok(StreamSlice {
            events: slice,
            is_end: end >= events.len(),
        })
    }

    async fn read_all_forward(
        &self,
        cursor: GlobalPosition,
        max_count: usize,
    ) -> DomainResult<AllSlice> {
        let inner = self.inner.read().await;
        let start = inner
            .log
            .partition_point(|e| e.global_sequence_number() <= cursor.value());
        let end = start.saturating_add(max_count).min(inner.log.len());
        let events = inner.log[start..end].to_vec();
        let next_position = events
            .last()
            .map_or(cursor, |e| GlobalPosition::from_value(e.global_sequence_number()));

        Ok(AllSlice {
            events,
            next_position,
            is_end: end >= inner.log.len(),
        })
    }

    async fn stream_version(&self, stream: &StreamId) -> DomainResult<Version> {
        let inner = self.inner.read().await;
        Ok(Version::from_value(
            inner.streams.get(stream).map_or(0, Vec::len),
        ))
    }

    async fn delete_stream(&self, stream: &StreamId) -> DomainResult<()> {
        let mut inner = self.inner.write().await;
        if inner.streams.remove(stream).is_some() {
            inner.log.retain(|e| {
                e.aggregate_type() != stream.aggregate_type() || e.aggregate_id() != stream.aggregate_id()
            });
            debug!(%stream, "stream deleted");
        }
        Ok(())
    }

    fn is_internal(&self, event: &CommittedEvent) -> bool {
        event.aggregate_type().starts_with('$')
    }
}
