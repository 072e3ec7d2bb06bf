use serde::{Serialize, de::DeserializeOwned};
use std::any::{Any, TypeId};
use std::fmt::Debug;

/// 显式声明的 `(名称, 版本)` 标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionedTag {
    pub name: &'static str,
    pub version: u32,
}

impl VersionedTag {
    pub const fn new(name: &'static str, version: u32) -> Self {
        Self { name, version }
    }
}

/// 可演进的载荷类型（事件或快照）
///
/// 一般通过 `#[versioned]` 宏实现。未声明 [`VersionedType::VERSIONED_TAG`] 时，
/// 注册表按类型名约定推导标签：去掉前缀 `Old`，尾部 `V<数字>` 作为版本号（缺省为 1）。
pub trait VersionedType: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    const VERSIONED_TAG: Option<VersionedTag> = None;
}

/// 类型擦除后的版本化载荷
///
/// 对所有 [`VersionedType`] 自动实现，用于在注册表、升级链与投影之间传递
/// 具体类型未知的载荷。
pub trait VersionedPayload: Debug + Send + Sync + 'static {
    /// 具体载荷类型的 `TypeId`
    fn payload_type_id(&self) -> TypeId;

    /// 具体载荷类型的完整类型名
    fn payload_type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    /// 序列化为 JSON 值
    fn to_value(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T: VersionedType> VersionedPayload for T {
    fn payload_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn payload_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl dyn VersionedPayload {
    /// 按具体类型借用载荷
    pub fn downcast_ref<T: VersionedType>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
