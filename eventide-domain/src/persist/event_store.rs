//! 事件存储（Event Store）
//!
//! 在 [`EventPersistence`] 之上提供：
//! - 追加前的批次校验（非空、同流、序号连续），期望版本 = 最小序号 - 1；
//! - 按流分批读取；
//! - 全局日志的“棘轮”分页：跳过内部流事件并持续读取直到凑满一页或读到末尾；
//! - 基于分页的全局事件流。
//!
use super::event_persistence::EventPersistence;
use super::serialized_event::{CommittedEvent, SerializedEvent, StreamId};
use crate::error::{DomainError, DomainResult};
use crate::value_object::{GlobalPosition, Version};
use bon::Builder;
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// 事件存储配置
#[derive(Debug, Clone, Builder, Deserialize)]
#[serde(default)]
pub struct EventStoreConfig {
    /// `stream_all` 每页事件数
    #[builder(default = 200)]
    pub page_size: usize,
    /// 按流读取时每次向后端请求的事件数
    #[builder(default = 500)]
    pub stream_read_batch: usize,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            stream_read_batch: 500,
        }
    }
}

/// 全局日志的一页
#[derive(Debug, Clone)]
pub struct AllEventsPage {
    /// 过滤内部流后的事件，按全局序号升序
    pub events: Vec<CommittedEvent>,
    /// 恰好位于本页最后一条事件之后的游标
    pub next_position: GlobalPosition,
    /// 已读到全局日志末尾
    pub is_end: bool,
}

#[derive(Clone)]
pub struct EventStore {
    persistence: Arc<dyn EventPersistence>,
    config: EventStoreConfig,
}

impl EventStore {
    pub fn new(persistence: Arc<dyn EventPersistence>) -> Self {
        Self::with_config(persistence, EventStoreConfig::default())
    }

    pub fn with_config(persistence: Arc<dyn EventPersistence>, config: EventStoreConfig) -> Self {
        Self {
            persistence,
            config,
        }
    }

    pub fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    /// 追加一批新事件
    #[instrument(skip_all, fields(stream = %stream, count = events.len()))]
    pub async fn append(
        &self,
        stream: &StreamId,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<Vec<CommittedEvent>> {
        let expected = expected_version(stream, &events)?;
        let committed = self.persistence.append(stream, expected, events).await?;
        debug!(
            expected = expected.value(),
            first_global = committed.first().map(CommittedEvent::global_sequence_number),
            "events committed"
        );
        Ok(committed)
    }

    /// 读取聚合序号不小于 `from_sequence_number` 的全部事件
    #[instrument(skip(self), fields(stream = %stream))]
    pub async fn load_from(
        &self,
        stream: &StreamId,
        from_sequence_number: usize,
    ) -> DomainResult<Vec<CommittedEvent>> {
        let batch = self.config.stream_read_batch.max(1);
        let mut next = from_sequence_number.max(1);
        let mut events = Vec::new();

        loop {
            let slice = self.persistence.read_forward(stream, next, batch).await?;
            let Some(last) = slice.events.last() else {
                break;
            };
            next = last.aggregate_sequence_number() + 1;
            events.extend(slice.events);
            if slice.is_end {
                break;
            }
        }

        debug!(count = events.len(), "stream loaded");
        Ok(events)
    }

    /// 读取全局日志的一页
    ///
    /// 向后端请求的条数不超过本页剩余容量，因此被过滤掉的内部事件之后
    /// 不会有可用事件被越过。
    #[instrument(skip(self, cancel), fields(cursor = %cursor))]
    pub async fn load_all_page(
        &self,
        cursor: GlobalPosition,
        page_size: usize,
        cancel: &CancellationToken,
    ) -> DomainResult<AllEventsPage> {
        let page_size = page_size.max(1);
        let mut events = Vec::with_capacity(page_size);
        let mut position = cursor;

        let is_end = loop {
            if cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }

            let remaining = page_size - events.len();
            let slice = self.persistence.read_all_forward(position, remaining).await?;
            let exhausted = slice.is_end || slice.events.is_empty();
            position = slice.next_position;

            events.extend(
                slice
                    .events
                    .into_iter()
                    .filter(|event| !self.persistence.is_internal(event)),
            );

            if exhausted {
                break true;
            }
            if events.len() >= page_size {
                break false;
            }
        };

        debug!(count = events.len(), next = %position, is_end, "page loaded");
        Ok(AllEventsPage {
            events,
            next_position: position,
            is_end,
        })
    }

    /// 从 `from` 开始按页读取全局日志，直到末尾
    pub fn stream_all(
        &self,
        from: GlobalPosition,
        cancel: CancellationToken,
    ) -> BoxStream<'static, DomainResult<CommittedEvent>> {
        let store = self.clone();
        let page_size = self.config.page_size;

        stream::try_unfold(Some(from), move |cursor| {
            let store = store.clone();
            let cancel = cancel.clone();
            async move {
                let Some(cursor) = cursor else {
                    return Ok::<_, DomainError>(None);
                };
                let page = store.load_all_page(cursor, page_size, &cancel).await?;
                let next = (!page.is_end).then_some(page.next_position);
                Ok(Some((page.events, next)))
            }
        })
        .map_ok(|events| stream::iter(events.into_iter().map(Ok::<_, DomainError>)))
        .try_flatten()
        .boxed()
    }

    /// 当前已存事件数
    pub async fn stream_version(&self, stream: &StreamId) -> DomainResult<Version> {
        self.persistence.stream_version(stream).await
    }

    #[instrument(skip(self), fields(stream = %stream))]
    pub async fn delete_stream(&self, stream: &StreamId) -> DomainResult<()> {
        self.persistence.delete_stream(stream).await
    }
}

/// 校验一批新事件并推导期望版本
fn expected_version(stream: &StreamId, events: &[SerializedEvent]) -> DomainResult<Version> {
    let Some(first) = events.first() else {
        return Err(DomainError::InvalidEventBatch {
            reason: "batch is empty".to_string(),
        });
    };

    let first_seq = first.aggregate_sequence_number();
    if first_seq == 0 {
        return Err(DomainError::InvalidEventBatch {
            reason: "sequence numbers start at 1".to_string(),
        });
    }

    for (offset, event) in events.iter().enumerate() {
        if event.aggregate_type() != stream.aggregate_type()
            || event.aggregate_id() != stream.aggregate_id()
        {
            return Err(DomainError::InvalidEventBatch {
                reason: format!("event of {} in batch for {stream}", event.stream_id()),
            });
        }
        if event.aggregate_sequence_number() != first_seq + offset {
            return Err(DomainError::InvalidEventBatch {
                reason: format!(
                    "sequence numbers not contiguous: expected {}, found {}",
                    first_seq + offset,
                    event.aggregate_sequence_number()
                ),
            });
        }
    }

    Ok(Version::from_value(first_seq - 1))
}
