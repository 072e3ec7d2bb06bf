use crate::error::DomainResult;
use crate::versioned::{VersionedPayload, VersionedTypeRegistry};
use std::fmt;

/// 聚合事件集合需要满足的能力边界
///
/// 每个事件变体包装一个版本化载荷；落盘时按载荷的 `(名称, 版本)` 序列化，
/// 读取时经升级链得到最新版本载荷，再由 [`DomainEvent::from_payload`] 还原。
/// 一般通过 `#[domain_event]` 宏实现。
pub trait DomainEvent: Clone + fmt::Debug + Send + Sync + 'static {
    /// 当前事件携带的载荷
    fn payload(&self) -> &dyn VersionedPayload;

    /// 由最新版本载荷还原事件，载荷类型不属于本集合时返回 `TypeMismatch`
    fn from_payload(payload: Box<dyn VersionedPayload>) -> DomainResult<Self>;

    /// 登记本集合可承载的全部载荷类型
    fn register_types(registry: &mut VersionedTypeRegistry);
}
