//! 聚合（Aggregate）抽象
//!
//! 约束一个聚合的核心行为：
//! - `execute` 将命令转换为事件（不改变状态）；
//! - `apply` 将事件投影到状态（改变状态，版本由回放引擎推进）；
//! - 通过 `Entity` 约束聚合具备标识与版本。
//!
use crate::domain_event::DomainEvent;
use crate::entity::Entity;
use crate::error::DomainError;
use crate::versioned::VersionedType;
use std::error::Error;

/// 聚合根接口
pub trait Aggregate: Entity + Default + Send + Sync + 'static {
    /// 聚合类型名，同时作为事件流的命名空间
    const TYPE: &'static str;

    /// 该聚合支持的命令类型
    type Command: Send;
    /// 该聚合产生的领域事件类型
    type Event: DomainEvent;
    /// 命令执行或持久化环节的错误类型
    type Error: Error + From<DomainError> + Send + Sync + 'static;

    /// 执行命令，返回产生的事件列表
    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// 应用事件，更新聚合状态
    fn apply(&mut self, event: &Self::Event);
}

/// 支持快照的聚合
///
/// 快照载荷同样是版本化类型，读取旧快照时会先升级到 `Self::Snapshot`。
pub trait SnapshotAggregate: Aggregate {
    type Snapshot: VersionedType;

    /// 生成当前状态的快照载荷
    fn create_snapshot(&self) -> Self::Snapshot;

    /// 由快照载荷恢复状态（标识与版本已由引擎设置）
    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// 应用一条已提交事件并推进版本
pub(crate) fn apply_committed<A: Aggregate>(aggregate: &mut A, event: &A::Event) {
    aggregate.apply(event);
    let next = aggregate.version().next();
    aggregate.set_version(next);
}
