//! 快照持久化模型
//!
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 快照元数据
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[builder(into)]
    aggregate_id: String,
    /// 聚合类型名
    #[builder(into)]
    aggregate_name: String,
    /// 快照反映的最后一条事件的聚合序号
    aggregate_sequence_number: usize,
    /// 快照载荷类型名
    #[builder(into)]
    snapshot_name: String,
    /// 快照载荷类型版本
    snapshot_version: u32,
}

impl SnapshotMetadata {
    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn aggregate_name(&self) -> &str {
        &self.aggregate_name
    }

    pub fn aggregate_sequence_number(&self) -> usize {
        self.aggregate_sequence_number
    }

    pub fn snapshot_name(&self) -> &str {
        &self.snapshot_name
    }

    pub fn snapshot_version(&self) -> u32 {
        self.snapshot_version
    }
}

/// 落盘的快照：元数据 + 载荷数据，写入后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    metadata: SnapshotMetadata,
    data: Value,
}

impl SerializedSnapshot {
    pub fn new(metadata: SnapshotMetadata, data: Value) -> Self {
        Self { metadata, data }
    }

    pub fn metadata(&self) -> &SnapshotMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

/// 解码并升级后的快照
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotContainer<S> {
    pub payload: S,
    pub metadata: SnapshotMetadata,
}
