//! 事件持久化模型
//!
//! `SerializedEvent` 是提交前的落盘形态，`CommittedEvent` 在其上附加存储层
//! 分配的全局序号。
//!
use crate::aggregate::Aggregate;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Deref;

/// 事件流标识：聚合类型 + 聚合 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId {
    aggregate_type: String,
    aggregate_id: String,
}

impl StreamId {
    pub fn new(aggregate_type: impl Into<String>, aggregate_id: impl Into<String>) -> Self {
        Self {
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
        }
    }

    /// 聚合实例对应的事件流
    pub fn of<A: Aggregate>(id: &A::Id) -> Self {
        Self::new(A::TYPE, id.to_string())
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.aggregate_type, self.aggregate_id)
    }
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// 聚合 ID，标识事件所属的聚合根实例
    #[builder(into)]
    aggregate_id: String,
    /// 聚合类型，用于区分不同的聚合根
    #[builder(into)]
    aggregate_type: String,
    /// 聚合内序号，从 1 开始连续递增
    aggregate_sequence_number: usize,
    /// 载荷类型名
    #[builder(into)]
    event_type_name: String,
    /// 载荷类型版本
    event_type_version: u32,
    /// 事件发生时间
    timestamp: DateTime<Utc>,
    /// 事件负载
    data: Value,
    /// 元数据（`EventMetadata` 的 JSON 形态）
    metadata: Value,
}

impl SerializedEvent {
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn stream_id(&self) -> StreamId {
        StreamId::new(self.aggregate_type.as_str(), self.aggregate_id.as_str())
    }

    pub fn aggregate_sequence_number(&self) -> usize {
        self.aggregate_sequence_number
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

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

/// 已提交事件，携带全局序号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedEvent {
    global_sequence_number: u64,
    #[serde(flatten)]
    event: SerializedEvent,
}

impl CommittedEvent {
    pub fn new(global_sequence_number: u64, event: SerializedEvent) -> Self {
        Self {
            global_sequence_number,
            event,
        }
    }

    pub fn global_sequence_number(&self) -> u64 {
        self.global_sequence_number
    }

    pub fn event(&self) -> &SerializedEvent {
        &self.event
    }

    pub fn into_event(self) -> SerializedEvent {
        self.event
    }
}

impl Deref for CommittedEvent {
    type Target = SerializedEvent;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}
