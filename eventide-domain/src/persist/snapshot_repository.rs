//! 快照后端协议与落盘策略
//!
use super::serialized_event::StreamId;
use super::serialized_snapshot::SerializedSnapshot;
use crate::error::DomainResult as Result;
use crate::value_object::Version;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;

#[async_trait]
pub trait SnapshotPersistence: Send + Sync {
    /// 聚合序号最高的快照
    async fn get_latest(&self, stream: &StreamId) -> Result<Option<SerializedSnapshot>>;

    /// 写入一份新快照（旧快照被取代，不会被修改）
    async fn put(&self, stream: &StreamId, snapshot: SerializedSnapshot) -> Result<()>;

    /// 删除聚合的全部快照
    async fn delete(&self, stream: &StreamId) -> Result<()>;
}

#[async_trait]
impl<T> SnapshotPersistence for Arc<T>
where
    T: SnapshotPersistence + ?Sized,
{
    async fn get_latest(&self, stream: &StreamId) -> Result<Option<SerializedSnapshot>> {
        (**self).get_latest(stream).await
    }

    async fn put(&self, stream: &StreamId, snapshot: SerializedSnapshot) -> Result<()> {
        (**self).put(stream, snapshot).await
    }

    async fn delete(&self, stream: &StreamId) -> Result<()> {
        (**self).delete(stream).await
    }
}

/// 快照策略
///
/// `Every(n)` 在一次提交使版本跨越 `n` 的整数倍边界时触发：
/// `floor(before / n) < floor(after / n)`。一次提交多条事件跳过边界时同样会触发。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "kind", content = "interval", rename_all = "snake_case")]
pub enum SnapshotPolicy {
    #[default]
    Never,
    Every(usize),
}

impl SnapshotPolicy {
    pub fn should_snapshot(&self, before: Version, after: Version) -> bool {
        match self {
            SnapshotPolicy::Never => false,
            SnapshotPolicy::Every(interval) => {
                let interval = (*interval).max(1);
                before.value() / interval < after.value() / interval
            }
        }
    }
}

/// 内存快照后端，保留每个流的全部历史快照
#[derive(Debug, Default)]
pub struct InMemorySnapshotPersistence {
    snapshots: DashMap<StreamId, Vec<SerializedSnapshot>>,
}

impl InMemorySnapshotPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 某个流已写入的快照数
    pub fn count(&self, stream: &StreamId) -> usize {
        self.snapshots.get(stream).map_or(0, |s| s.len())
    }
}

#[async_trait]
impl SnapshotPersistence for InMemorySnapshotPersistence {
    async fn get_latest(&self, stream: &StreamId) -> Result<Option<SerializedSnapshot>> {
        Ok(self.snapshots.get(stream).and_then(|history| {
            history
                .iter()
                .max_by_key(|s| s.metadata().aggregate_sequence_number())
                .cloned()
        }))
    }

    async fn put(&self, stream: &StreamId, snapshot: SerializedSnapshot) -> Result<()> {
        self.snapshots
            .entry(stream.clone())
            .or_default()
            .push(snapshot);
        Ok(())
    }

    async fn delete(&self, stream: &StreamId) -> Result<()> {
        self.snapshots.remove(stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::SnapshotMetadata;

    fn v(n: usize) -> Version {
        Version::from_value(n)
    }

    #[test]
    fn never_policy_never_snapshots() {
        assert!(!SnapshotPolicy::Never.should_snapshot(v(0), v(100)));
    }

    #[test]
    fn every_policy_triggers_on_boundary_crossing() {
        let policy = SnapshotPolicy::Every(3);
        assert!(!policy.should_snapshot(v(0), v(2)));
        assert!(policy.should_snapshot(v(2), v(3)));
        assert!(!policy.should_snapshot(v(3), v(5)));
        // 一次提交跳过边界
        assert!(policy.should_snapshot(v(5), v(7)));
        assert!(policy.should_snapshot(v(0), v(10)));
    }

    #[test]
    fn policy_deserializes_from_config() {
        let every: SnapshotPolicy =
            serde_json::from_value(serde_json::json!({ "kind": "every", "interval": 50 })).unwrap();
        assert_eq!(every, SnapshotPolicy::Every(50));
        let never: SnapshotPolicy =
            serde_json::from_value(serde_json::json!({ "kind": "never" })).unwrap();
        assert_eq!(never, SnapshotPolicy::Never);
    }

    #[tokio::test]
    async fn latest_snapshot_wins() {
        let store = InMemorySnapshotPersistence::new();
        let stream = StreamId::new("thingy", "1");
        for seq in [3, 9, 6] {
            let metadata = SnapshotMetadata::builder()
                .aggregate_id("1")
                .aggregate_name("thingy")
                .aggregate_sequence_number(seq)
                .snapshot_name("ThingySnapshot")
                .snapshot_version(1)
                .build();
            store
                .put(&stream, SerializedSnapshot::new(metadata, serde_json::json!({})))
                .await
                .unwrap();
        }

        let latest = store.get_latest(&stream).await.unwrap().unwrap();
        assert_eq!(latest.metadata().aggregate_sequence_number(), 9);
        assert_eq!(store.count(&stream), 3);

        store.delete(&stream).await.unwrap();
        assert!(store.get_latest(&stream).await.unwrap().is_none());
    }
}
