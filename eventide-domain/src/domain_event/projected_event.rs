use super::metadata::EventMetadata;
use crate::persist::StreamId;
use crate::versioned::{VersionedPayload, VersionedType};
use bon::Builder;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// 已解码并升级到最新版本的已提交事件，供读模型折叠
#[derive(Builder, Debug, Clone)]
pub struct ProjectedEvent {
    #[builder(into)]
    aggregate_type: String,
    #[builder(into)]
    aggregate_id: String,
    aggregate_sequence_number: usize,
    global_sequence_number: u64,
    /// 落盘时的载荷标签（升级前）
    #[builder(into)]
    event_type_name: String,
    event_type_version: u32,
    timestamp: DateTime<Utc>,
    metadata: EventMetadata,
    payload: Arc<dyn VersionedPayload>,
}

impl ProjectedEvent {
    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn stream_id(&self) -> StreamId {
        StreamId::new(self.aggregate_type.as_str(), self.aggregate_id.as_str())
    }

    pub fn aggregate_sequence_number(&self) -> usize {
        self.aggregate_sequence_number
    }

    pub fn global_sequence_number(&self) -> u64 {
        self.global_sequence_number
    }

    pub fn event_type_name(&self) -> &str {
        &self.event_type_name
    }

    pub fn event_type_version(&self) -> u32 {
        self.event_type_version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn payload(&self) -> &dyn VersionedPayload {
        self.payload.as_ref()
    }

    /// 载荷为 `T` 时返回其引用
    pub fn payload_as<T: VersionedType>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }
}
