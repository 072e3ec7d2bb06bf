/// 银行账户示例
/// 演示命令执行、旧版本事件升级、快照以及读模型投影的完整流程
use eventide_domain::aggregate::{Aggregate, SnapshotAggregate};
use eventide_domain::aggregate_root::AggregateRoot;
use eventide_domain::domain_event::{DomainEvent, EventContext, ProjectedEvent};
use eventide_domain::entity::Entity;
use eventide_domain::error::{DomainError, DomainResult};
use eventide_domain::persist::{
    EventCodec, EventSourcedRepository, EventStore, InMemoryEventPersistence,
    InMemorySnapshotPersistence, SerializedEvent, SnapshotPolicy, SnapshottingRepository,
    StreamId,
};
use eventide_domain::projection::{
    InMemoryReadModelPersistence, ProjectionRunner, ReadModel, ReadModelContext,
    ReadModelDispatcher, ReadModelProjector, ReadModelStore, RunnerConfig,
};
use eventide_domain::value_object::GlobalPosition;
use eventide_domain::versioned::{UpgraderRegistry, VersionedTypeRegistry, VersionedTypeUpgrader};
use eventide_macros::{domain_event, entity, entity_id, versioned};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// 领域模型定义
// ============================================================================

#[entity_id]
struct AccountId(String);

#[entity(id = AccountId)]
#[derive(Clone)]
struct Account {
    owner: String,
    balance: i64,
}

#[derive(Debug, Clone)]
enum AccountCommand {
    Open { owner: String },
    Deposit { amount: i64 },
    Withdraw { amount: i64 },
}

/// 第一版开户事件只记录了姓名
#[versioned]
struct OldAccountOpened {
    name: String,
}

#[versioned(name = "AccountOpened", version = 2)]
struct AccountOpened {
    owner: String,
}

#[versioned]
struct MoneyDeposited {
    amount: i64,
}

#[versioned]
struct MoneyWithdrawn {
    amount: i64,
}

#[versioned]
struct AccountSnapshot {
    owner: String,
    balance: i64,
}

#[domain_event]
enum AccountEvent {
    Opened(AccountOpened),
    Deposited(MoneyDeposited),
    Withdrawn(MoneyWithdrawn),
}

impl Aggregate for Account {
    const TYPE: &'static str = "account";
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Open { owner } => {
                if self.version().is_created() {
                    return Err(DomainError::InvalidState {
                        reason: "account already opened".into(),
                    });
                }
                Ok(vec![AccountEvent::Opened(AccountOpened { owner })])
            }
            AccountCommand::Deposit { amount } => {
                if amount <= 0 {
                    return Err(DomainError::InvalidCommand {
                        reason: "deposit must be positive".into(),
                    });
                }
                Ok(vec![AccountEvent::Deposited(MoneyDeposited { amount })])
            }
            AccountCommand::Withdraw { amount } => {
                if amount > self.balance {
                    return Err(DomainError::InvalidState {
                        reason: "insufficient balance".into(),
                    });
                }
                Ok(vec![AccountEvent::Withdrawn(MoneyWithdrawn { amount })])
            }
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::Opened(e) => self.owner = e.owner.clone(),
            AccountEvent::Deposited(e) => self.balance += e.amount,
            AccountEvent::Withdrawn(e) => self.balance -= e.amount,
        }
    }
}

impl SnapshotAggregate for Account {
    type Snapshot = AccountSnapshot;

    fn create_snapshot(&self) -> Self::Snapshot {
        AccountSnapshot {
            owner: self.owner.clone(),
            balance: self.balance,
        }
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        self.owner = snapshot.owner;
        self.balance = snapshot.balance;
    }
}

// ============================================================================
// 读模型
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountSummary {
    owner: String,
    balance: i64,
    transactions: usize,
}

impl ReadModel for AccountSummary {
    const NAME: &'static str = "account_summary";

    fn apply(
        &mut self,
        _context: &mut ReadModelContext,
        event: &ProjectedEvent,
    ) -> DomainResult<bool> {
        if let Some(opened) = event.payload_as::<AccountOpened>() {
            self.owner = opened.owner.clone();
        } else if let Some(deposited) = event.payload_as::<MoneyDeposited>() {
            self.balance += deposited.amount;
            self.transactions += 1;
        } else if let Some(withdrawn) = event.payload_as::<MoneyWithdrawn>() {
            self.balance -= withdrawn.amount;
            self.transactions += 1;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

fn codec() -> EventCodec {
    let mut types = VersionedTypeRegistry::new()
        .with::<OldAccountOpened>()
        .with::<AccountSnapshot>();
    AccountEvent::register_types(&mut types);

    let mut upgraders = UpgraderRegistry::new();
    upgraders.register_fn(|old: OldAccountOpened| Ok(AccountOpened { owner: old.name }));

    EventCodec::new(Arc::new(VersionedTypeUpgrader::new(
        Arc::new(types),
        Arc::new(upgraders),
    )))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== 银行账户示例 ===\n");

    let store = EventStore::new(Arc::new(InMemoryEventPersistence::new()));
    let codec = codec();

    // 一个旧系统留下的账户：开户事件仍是第一版格式
    let legacy = StreamId::new("account", "acc-legacy");
    store
        .append(
            &legacy,
            vec![
                SerializedEvent::builder()
                    .aggregate_id("acc-legacy")
                    .aggregate_type("account")
                    .aggregate_sequence_number(1)
                    .event_type_name("AccountOpened")
                    .event_type_version(1)
                    .timestamp(chrono::Utc::now())
                    .data(serde_json::json!({ "name": "Grace" }))
                    .metadata(serde_json::json!({}))
                    .build(),
            ],
        )
        .await?;

    // 读模型：运行器在后台跟随全局日志
    let summaries = Arc::new(ReadModelStore::<AccountSummary>::new(Arc::new(
        InMemoryReadModelPersistence::new(),
    )));
    let dispatcher = Arc::new(
        ReadModelDispatcher::new(codec.clone())
            .register(Arc::new(ReadModelProjector::per_aggregate(summaries.clone()))),
    );
    let runner = Arc::new(
        ProjectionRunner::builder()
            .store(store.clone())
            .dispatcher(dispatcher)
            .config(
                RunnerConfig::builder()
                    .poll_interval(Duration::from_millis(20))
                    .page_size(100)
                    .build(),
            )
            .build(),
    );
    let handle = runner.start();

    let repo = SnapshottingRepository::new(
        EventSourcedRepository::new(store.clone(), codec),
        Arc::new(InMemorySnapshotPersistence::new()),
        SnapshotPolicy::Every(3),
    );
    let root = AggregateRoot::<Account, _>::new(repo);
    let context = EventContext::builder()
        .correlation_id("demo-1")
        .actor_type("teller")
        .build();

    let id = AccountId::new("acc-1".to_string());
    let commands = [
        AccountCommand::Open {
            owner: "Ada".into(),
        },
        AccountCommand::Deposit { amount: 500 },
        AccountCommand::Withdraw { amount: 200 },
        AccountCommand::Deposit { amount: 50 },
    ];
    let mut last = GlobalPosition::START;
    for command in commands {
        let committed = root.execute(&id, command.clone(), &context).await?;
        let sequences: Vec<usize> = committed
            .iter()
            .map(|e| e.aggregate_sequence_number())
            .collect();
        println!("✅ {command:?} → 序号 {sequences:?}");
        if let Some(event) = committed.last() {
            last = GlobalPosition::from_value(event.global_sequence_number());
        }
    }

    match root
        .execute(&id, AccountCommand::Withdraw { amount: 10_000 }, &context)
        .await
    {
        Ok(_) => println!("❌ 透支竟然成功"),
        Err(error) => println!("✅ 透支被拒绝: {error}"),
    }

    let account = root.load(&id).await?;
    println!(
        "\n聚合: id={}, 版本={}, 户主={}, 余额={}",
        account.id(),
        account.version(),
        account.owner,
        account.balance
    );

    let legacy_account = root.load(&AccountId::new("acc-legacy".to_string())).await?;
    println!("旧账户升级后的户主: {}", legacy_account.owner);

    handle.wait_until(last).await?;
    for read_model_id in ["acc-1", "acc-legacy"] {
        let summary = summaries.get(read_model_id).await?;
        println!(
            "读模型 {read_model_id}: 版本={:?}, {:?}",
            summary.version(),
            summary.read_model()
        );
    }

    handle.shutdown();
    handle.join().await;
    Ok(())
}
