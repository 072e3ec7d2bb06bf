//! 事件溯源持久化与投影引擎（eventide-domain）
//!
//! 提供以事件溯源为中心的通用构件：
//! - 版本化类型（`versioned`）：`(名称, 版本)` 注册表与逐级升级链
//! - 聚合（`aggregate`）与实体（`entity`）建模
//! - 领域事件（`domain_event`）与投影事件
//! - 事件存储、快照与聚合仓储（`persist`）
//! - 读模型投影（`projection`）：比较并交换、冲突重试、分发与重建
//! - 重试策略（`retry`）
//!
//! 本 crate 与具体存储后端解耦，仅定义后端协议并附带内存参考实现，
//! 以便在不同基础设施（例如 Postgres、消息中间件等）上进行适配实现。
//!
//! 典型用法：
//! 1. 用 `#[versioned]` 定义事件载荷，用 `#[domain_event]` 组合为聚合事件；
//! 2. 定义聚合并实现 `Aggregate` 的 `execute/apply`；
//! 3. 构建 `VersionedTypeRegistry` 与 `UpgraderRegistry`，装配 `EventCodec` 与仓储；
//! 4. 通过 `AggregateRoot` 编排一条完整的命令到事件提交、读模型更新的流程。
//!
pub mod aggregate;
pub mod aggregate_root;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod persist;
pub mod projection;
pub mod retry;
pub mod value_object;
pub mod versioned;

pub use eventide_macros::{domain_event, entity, entity_id, value_object, versioned};

// 允许在本 crate 内部通过 ::eventide_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::eventide_domain 路径。
extern crate self as eventide_domain;
