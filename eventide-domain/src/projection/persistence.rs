//! 读模型存储后端协议与内存实现
//!
use crate::domain_event::ProjectedEvent;
use crate::error::{DomainError, DomainResult as Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 读模型已吸收的进度：每条来源流已应用到的最大聚合序号
///
/// 同一事件被再次投递（运行器重试整页、更新批次部分成功后重跑）时据此跳过。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadModelCheckpoint(BTreeMap<String, usize>);

impl ReadModelCheckpoint {
    fn stream_key(event: &ProjectedEvent) -> String {
        format!("{}-{}", event.aggregate_type(), event.aggregate_id())
    }

    pub fn covers(&self, event: &ProjectedEvent) -> bool {
        self.0
            .get(&Self::stream_key(event))
            .is_some_and(|applied| *applied >= event.aggregate_sequence_number())
    }

    pub fn record(&mut self, event: &ProjectedEvent) {
        let applied = self.0.entry(Self::stream_key(event)).or_default();
        *applied = (*applied).max(event.aggregate_sequence_number());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 已持久化的读模型
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReadModel {
    pub value: Value,
    pub version: u64,
    pub checkpoint: ReadModelCheckpoint,
}

impl StoredReadModel {
    pub fn new(value: Value, version: u64) -> Self {
        Self {
            value,
            version,
            checkpoint: ReadModelCheckpoint::default(),
        }
    }

    pub fn with_checkpoint(self, checkpoint: ReadModelCheckpoint) -> Self {
        Self { checkpoint, ..self }
    }
}

#[async_trait]
pub trait ReadModelPersistence: Send + Sync {
    async fn get(&self, read_model_id: &str) -> Result<Option<StoredReadModel>>;

    /// 仅当当前版本等于 `expected_version`（`None` 表示不存在）时写入 `new`，
    /// 否则返回 `ReadModelConflict`
    async fn compare_and_swap(
        &self,
        read_model_id: &str,
        expected_version: Option<u64>,
        new: StoredReadModel,
    ) -> Result<()>;

    async fn delete(&self, read_model_id: &str) -> Result<()>;

    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
impl<T> ReadModelPersistence for Arc<T>
where
    T: ReadModelPersistence + ?Sized,
{
    async fn get(&self, read_model_id: &str) -> Result<Option<StoredReadModel>> {
        (**self).get(read_model_id).await
    }

    async fn compare_and_swap(
        &self,
        read_model_id: &str,
        expected_version: Option<u64>,
        new: StoredReadModel,
    ) -> Result<()> {
        (**self)
            .compare_and_swap(read_model_id, expected_version, new)
            .await
    }

    async fn delete(&self, read_model_id: &str) -> Result<()> {
        (**self).delete(read_model_id).await
    }

    async fn delete_all(&self) -> Result<()> {
        (**self).delete_all().await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryReadModelPersistence {
    models: DashMap<String, StoredReadModel>,
}

impl InMemoryReadModelPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn conflict(read_model_id: &str, expected: Option<u64>, actual: Option<u64>) -> DomainError {
    DomainError::ReadModelConflict {
        read_model_id: read_model_id.to_string(),
        expected,
        actual,
    }
}

#[async_trait]
impl ReadModelPersistence for InMemoryReadModelPersistence {
    async fn get(&self, read_model_id: &str) -> Result<Option<StoredReadModel>> {
        Ok(self.models.get(read_model_id).map(|entry| entry.value().clone()))
    }

    async fn compare_and_swap(
        &self,
        read_model_id: &str,
        expected_version: Option<u64>,
        stored: StoredReadModel,
    ) -> Result<()> {
        match self.models.entry(read_model_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let actual = entry.get().version;
                if expected_version != Some(actual) {
                    return Err(conflict(read_model_id, expected_version, Some(actual)));
                }
                entry.insert(stored);
            }
            Entry::Vacant(entry) => {
                if expected_version.is_some() {
                    return Err(conflict(read_model_id, expected_version, None));
                }
                entry.insert(stored);
            }
        }
        Ok(())
    }

    async fn delete(&self, read_model_id: &str) -> Result<()> {
        self.models.remove(read_model_id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.models.clear();
        Ok(())
    }
}
