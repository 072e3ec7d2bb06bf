use anyhow::Result as AnyResult;
use chrono::Utc;
use eventide_domain::aggregate::{Aggregate, SnapshotAggregate};
use eventide_domain::domain_event::{DomainEvent, EventContext};
use eventide_domain::entity::Entity;
use eventide_domain::error::{DomainError, DomainResult};
use eventide_domain::persist::{
    AggregateRepository, EventCodec, EventSourcedRepository, EventStore,
    InMemoryEventPersistence, InMemorySnapshotPersistence, SerializedEvent, SerializedSnapshot,
    SnapshotMetadata, SnapshotPersistence, SnapshotPolicy, SnapshottingRepository, StreamId,
};
use eventide_domain::value_object::Version;
use eventide_domain::versioned::{
    TypeUpgrader, UpgraderRegistry, VersionedTypeRegistry, VersionedTypeUpgrader,
};
use eventide_macros::{domain_event, entity, versioned};
use serde_json::json;
use std::sync::Arc;

// 载荷的三个历史版本，均以 ("ThingyPinged", n) 落盘
#[versioned]
struct ThingyPingedV1 {
    message: String,
}

#[versioned]
struct ThingyPingedV2 {
    message: String,
    count: u32,
}

#[versioned]
struct ThingyPingedV3 {
    text: String,
    count: u32,
    source: String,
}

#[versioned]
struct OldThingySnapshot {
    messages: Vec<String>,
}

#[versioned(name = "ThingySnapshot", version = 2)]
struct ThingySnapshot {
    texts: Vec<String>,
    total: u32,
}

#[domain_event]
enum ThingyEvent {
    Pinged(ThingyPingedV3),
}

#[entity]
#[derive(Clone)]
struct Thingy {
    texts: Vec<String>,
    total: u32,
}

impl Aggregate for Thingy {
    const TYPE: &'static str = "thingy";
    type Command = String;
    type Event = ThingyEvent;
    type Error = DomainError;

    fn execute(&self, text: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        Ok(vec![ThingyEvent::Pinged(ThingyPingedV3 {
            text,
            count: 1,
            source: "live".into(),
        })])
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ThingyEvent::Pinged(e) => {
                self.texts.push(e.text.clone());
                self.total += e.count;
            }
        }
    }
}

impl SnapshotAggregate for Thingy {
    type Snapshot = ThingySnapshot;

    fn create_snapshot(&self) -> Self::Snapshot {
        ThingySnapshot {
            texts: self.texts.clone(),
            total: self.total,
        }
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        self.texts = snapshot.texts;
        self.total = snapshot.total;
    }
}

struct V2ToV3;

impl TypeUpgrader<ThingyPingedV2, ThingyPingedV3> for V2ToV3 {
    fn upgrade(&self, from: ThingyPingedV2) -> DomainResult<ThingyPingedV3> {
        Ok(ThingyPingedV3 {
            text: from.message,
            count: from.count,
            source: "legacy".into(),
        })
    }
}

fn codec(with_v2_to_v3: bool) -> EventCodec {
    let mut types = VersionedTypeRegistry::new()
        .with::<ThingyPingedV1>()
        .with::<ThingyPingedV2>()
        .with::<OldThingySnapshot>()
        .with::<ThingySnapshot>();
    ThingyEvent::register_types(&mut types);

    let mut upgraders = UpgraderRegistry::new();
    upgraders
        .register_fn(|v1: ThingyPingedV1| {
            Ok(ThingyPingedV2 {
                message: v1.message,
                count: 1,
            })
        })
        .register_fn(|old: OldThingySnapshot| {
            let total = old.messages.len() as u32;
            Ok(ThingySnapshot {
                texts: old.messages,
                total,
            })
        });
    if with_v2_to_v3 {
        upgraders.register::<ThingyPingedV2, ThingyPingedV3, _>(V2ToV3);
    }

    EventCodec::new(Arc::new(VersionedTypeUpgrader::new(
        Arc::new(types),
        Arc::new(upgraders),
    )))
}

fn stored(id: &str, seq: usize, version: u32, data: serde_json::Value) -> SerializedEvent {
    SerializedEvent::builder()
        .aggregate_id(id)
        .aggregate_type("thingy")
        .aggregate_sequence_number(seq)
        .event_type_name("ThingyPinged")
        .event_type_version(version)
        .timestamp(Utc::now())
        .data(data)
        .metadata(json!({}))
        .build()
}

/// 以旧版本标签直接写入一条混合版本的历史
async fn seed_legacy_history(store: &EventStore, id: &str) -> AnyResult<()> {
    let stream = StreamId::new("thingy", id);
    store
        .append(
            &stream,
            vec![
                stored(id, 1, 1, json!({ "message": "first" })),
                stored(id, 2, 2, json!({ "message": "second", "count": 5 })),
                stored(
                    id,
                    3,
                    3,
                    json!({ "text": "third", "count": 2, "source": "live" }),
                ),
            ],
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn mixed_version_history_replays_as_latest() -> AnyResult<()> {
    let store = EventStore::new(Arc::new(InMemoryEventPersistence::new()));
    seed_legacy_history(&store, "t-1").await?;
    let repo = EventSourcedRepository::<Thingy>::new(store, codec(true));

    let thingy = repo.load(&"t-1".to_string()).await?;
    assert_eq!(thingy.version(), Version::from_value(3));
    assert_eq!(thingy.texts, vec!["first", "second", "third"]);
    assert_eq!(thingy.total, 1 + 5 + 2);
    Ok(())
}

#[tokio::test]
async fn upgraded_payload_equals_direct_construction() -> AnyResult<()> {
    let store = EventStore::new(Arc::new(InMemoryEventPersistence::new()));
    seed_legacy_history(&store, "t-2").await?;
    let codec = codec(true);

    let committed = store.load_from(&StreamId::new("thingy", "t-2"), 1).await?;
    let projected = codec.project_all(&committed)?;

    let first = projected[0]
        .payload_as::<ThingyPingedV3>()
        .expect("upgraded to v3");
    assert_eq!(
        first,
        &ThingyPingedV3 {
            text: "first".into(),
            count: 1,
            source: "legacy".into(),
        }
    );
    // 标签保留落盘时的版本
    assert_eq!(projected[0].event_type_version(), 1);
    assert_eq!(projected[2].event_type_version(), 3);
    Ok(())
}

#[tokio::test]
async fn upgrading_the_latest_version_is_idempotent() -> AnyResult<()> {
    let codec = codec(true);
    let latest = ThingyPingedV3 {
        text: "t".into(),
        count: 9,
        source: "s".into(),
    };

    let once: ThingyPingedV3 = codec.upgrader().upgrade_as(Box::new(latest.clone()))?;
    let twice: ThingyPingedV3 = codec.upgrader().upgrade_as(Box::new(once.clone()))?;
    assert_eq!(once, latest);
    assert_eq!(twice, latest);
    Ok(())
}

#[tokio::test]
async fn broken_chain_fails_the_load() -> AnyResult<()> {
    let store = EventStore::new(Arc::new(InMemoryEventPersistence::new()));
    seed_legacy_history(&store, "t-3").await?;
    let repo = EventSourcedRepository::<Thingy>::new(store, codec(false));

    let err = repo.load(&"t-3".to_string()).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::UpgradeChainBroken {
            from_version: 2,
            to_version: 3,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn new_events_are_written_with_the_latest_tag() -> AnyResult<()> {
    let store = EventStore::new(Arc::new(InMemoryEventPersistence::new()));
    let repo = EventSourcedRepository::<Thingy>::new(store.clone(), codec(true));
    let id = "t-4".to_string();

    let mut thingy = repo.load(&id).await?;
    let events = thingy.execute("hello".into())?;
    repo.commit(&mut thingy, events, &EventContext::default())
        .await?;

    let committed = store.load_from(&StreamId::new("thingy", "t-4"), 1).await?;
    assert_eq!(committed[0].event_type_name(), "ThingyPinged");
    assert_eq!(committed[0].event_type_version(), 3);
    Ok(())
}

#[tokio::test]
async fn legacy_snapshot_is_upgraded_on_restore() -> AnyResult<()> {
    let store = EventStore::new(Arc::new(InMemoryEventPersistence::new()));
    seed_legacy_history(&store, "t-5").await?;

    // 覆盖前两条事件的旧版快照
    let snapshots = Arc::new(InMemorySnapshotPersistence::new());
    let stream = StreamId::new("thingy", "t-5");
    snapshots
        .put(
            &stream,
            SerializedSnapshot::new(
                SnapshotMetadata::builder()
                    .aggregate_id("t-5")
                    .aggregate_name("thingy")
                    .aggregate_sequence_number(2)
                    .snapshot_name("ThingySnapshot")
                    .snapshot_version(1)
                    .build(),
                json!({ "messages": ["a", "b"] }),
            ),
        )
        .await?;

    let repo = SnapshottingRepository::<Thingy>::new(
        EventSourcedRepository::new(store, codec(true)),
        snapshots,
        SnapshotPolicy::Never,
    );

    let thingy = repo.load(&"t-5".to_string()).await?;
    assert_eq!(thingy.version(), Version::from_value(3));
    // 快照状态加上第三条事件
    assert_eq!(thingy.texts, vec!["a", "b", "third"]);
    assert_eq!(thingy.total, 2 + 2);
    Ok(())
}
