use anyhow::Result as AnyResult;
use async_trait::async_trait;
use eventide_domain::aggregate::{Aggregate, SnapshotAggregate};
use eventide_domain::domain_event::{DomainEvent, EventContext};
use eventide_domain::entity::Entity;
use eventide_domain::error::{DomainError, DomainResult};
use eventide_domain::persist::{
    AggregateRepository, AllSlice, CommittedEvent, EventCodec, EventPersistence, EventSourcedRepository,
    EventStore, InMemoryEventPersistence, InMemorySnapshotPersistence, SerializedEvent,
    SerializedSnapshot, SnapshotPersistence, SnapshotPolicy, SnapshottingRepository, StreamId,
    StreamSlice,
};
use eventide_domain::value_object::{GlobalPosition, Version};
use eventide_domain::versioned::{UpgraderRegistry, VersionedTypeRegistry, VersionedTypeUpgrader};
use eventide_macros::{domain_event, entity, versioned};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[entity]
#[derive(Clone)]
struct Counter {
    value: i64,
}

#[versioned]
struct Incremented {
    by: i64,
}

#[versioned]
struct CounterSnapshot {
    value: i64,
}

#[domain_event]
enum CounterEvent {
    Incremented(Incremented),
}

impl Aggregate for Counter {
    const TYPE: &'static str = "counter";
    type Command = i64;
    type Event = CounterEvent;
    type Error = DomainError;

    fn execute(&self, by: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        Ok(vec![CounterEvent::Incremented(Incremented { by })])
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CounterEvent::Incremented(e) => self.value += e.by,
        }
    }
}

impl SnapshotAggregate for Counter {
    type Snapshot = CounterSnapshot;

    fn create_snapshot(&self) -> Self::Snapshot {
        CounterSnapshot { value: self.value }
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        self.value = snapshot.value;
    }
}

/// 统计按流读取时读到的事件数
#[derive(Default)]
struct CountingPersistence {
    inner: InMemoryEventPersistence,
    events_read: AtomicUsize,
}

#[async_trait]
impl EventPersistence for CountingPersistence {
    async fn append(
        &self,
        stream: &StreamId,
        expected_version: Version,
        events: Vec<SerializedEvent>,
    ) -> DomainResult<Vec<CommittedEvent>> {
        self.inner.append(stream, expected_version, events).await
    }

    async fn read_forward(
        &self,
        stream: &StreamId,
        from_sequence_number: usize,
        max_count: usize,
    ) -> DomainResult<StreamSlice> {
        let slice = self
            .inner
            .read_forward(stream, from_sequence_number, max_count)
            .await?;
        self.events_read
            .fetch_add(slice.events.len(), Ordering::SeqCst);
        Ok(slice)
    }

    async fn read_all_forward(
        &self,
        cursor: GlobalPosition,
        max_count: usize,
    ) -> DomainResult<AllSlice> {
        self.inner.read_all_forward(cursor, max_count).await
    }

    async fn stream_version(&self, stream: &StreamId) -> DomainResult<Version> {
        self.inner.stream_version(stream).await
    }

    async fn delete_stream(&self, stream: &StreamId) -> DomainResult<()> {
        self.inner.delete_stream(stream).await
    }
}

/// 写入总是失败的快照后端
struct BrokenSnapshots;

#[async_trait]
impl SnapshotPersistence for BrokenSnapshots {
    async fn get_latest(&self, _stream: &StreamId) -> DomainResult<Option<SerializedSnapshot>> {
        Ok(None)
    }

    async fn put(&self, _stream: &StreamId, _snapshot: SerializedSnapshot) -> DomainResult<()> {
        Err(DomainError::backend_unavailable("snapshots", "disk full"))
    }

    async fn delete(&self, _stream: &StreamId) -> DomainResult<()> {
        Ok(())
    }
}

fn codec() -> EventCodec {
    let mut types = VersionedTypeRegistry::new();
    CounterEvent::register_types(&mut types);
    types.register::<CounterSnapshot>();
    EventCodec::new(Arc::new(VersionedTypeUpgrader::new(
        Arc::new(types),
        Arc::new(UpgraderRegistry::new()),
    )))
}

struct Fixture {
    events: Arc<CountingPersistence>,
    snapshots: Arc<InMemorySnapshotPersistence>,
    repo: SnapshottingRepository<Counter>,
}

fn fixture(policy: SnapshotPolicy) -> Fixture {
    let events = Arc::new(CountingPersistence::default());
    let snapshots = Arc::new(InMemorySnapshotPersistence::new());
    let repo = SnapshottingRepository::new(
        EventSourcedRepository::new(EventStore::new(events.clone()), codec()),
        snapshots.clone(),
        policy,
    );
    Fixture {
        events,
        snapshots,
        repo,
    }
}

async fn increment(
    repo: &impl AggregateRepository<Counter>,
    id: &str,
    times: usize,
) -> AnyResult<Counter> {
    let mut counter = repo.load(&id.to_string()).await?;
    let events = (0..times)
        .map(|_| CounterEvent::Incremented(Incremented { by: 1 }))
        .collect();
    repo.commit(&mut counter, events, &EventContext::default())
        .await?;
    Ok(counter)
}

#[tokio::test]
async fn snapshot_limits_events_replayed_on_load() -> AnyResult<()> {
    let f = fixture(SnapshotPolicy::Every(100));
    let stream = StreamId::new("counter", "c-1");

    // 一次提交 100 条，跨过边界 100，写入快照
    let counter = increment(&f.repo, "c-1", 100).await?;
    assert_eq!(counter.version(), Version::from_value(100));
    assert_eq!(f.snapshots.count(&stream), 1);

    // 再追加 5 条，不跨边界
    increment(&f.repo, "c-1", 5).await?;
    assert_eq!(f.snapshots.count(&stream), 1);

    let before = f.events.events_read.load(Ordering::SeqCst);
    let loaded = f.repo.load(&"c-1".to_string()).await?;
    let replayed = f.events.events_read.load(Ordering::SeqCst) - before;

    assert_eq!(loaded.version(), Version::from_value(105));
    assert_eq!(loaded.value, 105);
    assert_eq!(replayed, 5);
    Ok(())
}

#[tokio::test]
async fn snapshots_follow_boundary_crossings() -> AnyResult<()> {
    let f = fixture(SnapshotPolicy::Every(3));
    let stream = StreamId::new("counter", "c-2");

    // 版本 0→2：不跨边界
    increment(&f.repo, "c-2", 2).await?;
    assert_eq!(f.snapshots.count(&stream), 0);
    // 2→4：跨过 3
    increment(&f.repo, "c-2", 2).await?;
    assert_eq!(f.snapshots.count(&stream), 1);
    // 4→5：不跨边界
    increment(&f.repo, "c-2", 1).await?;
    assert_eq!(f.snapshots.count(&stream), 1);
    // 5→12：一次跨过多个边界，只写一份
    increment(&f.repo, "c-2", 7).await?;
    assert_eq!(f.snapshots.count(&stream), 2);

    let latest = f.snapshots.get_latest(&stream).await?.expect("snapshot");
    assert_eq!(latest.metadata().aggregate_sequence_number(), 12);

    let loaded = f.repo.load(&"c-2".to_string()).await?;
    assert_eq!(loaded.value, 12);
    Ok(())
}

#[tokio::test]
async fn failing_snapshot_backend_never_fails_the_commit() -> AnyResult<()> {
    let events = Arc::new(InMemoryEventPersistence::new());
    let repo = SnapshottingRepository::<Counter>::new(
        EventSourcedRepository::new(EventStore::new(events), codec()),
        Arc::new(BrokenSnapshots),
        SnapshotPolicy::Every(1),
    );

    let counter = increment(&repo, "c-3", 3).await?;
    assert_eq!(counter.version(), Version::from_value(3));

    let loaded = repo.load(&"c-3".to_string()).await?;
    assert_eq!(loaded.value, 3);
    Ok(())
}

#[tokio::test]
async fn stale_aggregate_commit_conflicts() -> AnyResult<()> {
    let f = fixture(SnapshotPolicy::Never);
    let id = "c-4".to_string();

    let mut first = f.repo.load(&id).await?;
    let mut second = f.repo.load(&id).await?;

    f.repo
        .commit(
            &mut first,
            vec![CounterEvent::Incremented(Incremented { by: 1 })],
            &EventContext::default(),
        )
        .await?;
    let err = f
        .repo
        .commit(
            &mut second,
            vec![CounterEvent::Incremented(Incremented { by: 2 })],
            &EventContext::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_concurrency_conflict());
    // 冲突的一方保持原状
    assert_eq!(second.version(), Version::new());
    assert_eq!(second.value, 0);
    Ok(())
}

#[tokio::test]
async fn delete_removes_stream_and_snapshots() -> AnyResult<()> {
    let f = fixture(SnapshotPolicy::Every(1));
    let id = "c-5".to_string();
    let stream = StreamId::new("counter", "c-5");

    increment(&f.repo, "c-5", 2).await?;
    assert_eq!(f.snapshots.count(&stream), 1);

    f.repo.delete(&id).await?;
    assert_eq!(f.snapshots.count(&stream), 0);

    let loaded = f.repo.load(&id).await?;
    assert_eq!(loaded.version(), Version::new());
    assert_eq!(loaded.value, 0);
    Ok(())
}
