use super::payload::{VersionedPayload, VersionedType};
use crate::error::{DomainError, DomainResult};
use serde_json::Value;
use std::any::{TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, warn};

type DecodeFn = fn(Value) -> serde_json::Result<Box<dyn VersionedPayload>>;

fn decode_as<T: VersionedType>(value: Value) -> serde_json::Result<Box<dyn VersionedPayload>> {
    Ok(Box::new(serde_json::from_value::<T>(value)?))
}

/// 一个已注册的版本化类型
#[derive(Debug, Clone)]
pub struct VersionedTypeDefinition {
    type_id: TypeId,
    type_name: &'static str,
    name: String,
    version: u32,
    decode: DecodeFn,
}

impl VersionedTypeDefinition {
    /// 为具体类型构造定义：优先使用显式标签，否则按类型名约定推导
    pub fn of<T: VersionedType>() -> Self {
        let (name, version) = match T::VERSIONED_TAG {
            Some(tag) => (tag.name.to_string(), tag.version),
            None => conventional_tag(type_name::<T>()),
        };
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name,
            version,
            decode: decode_as::<T>,
        }
    }

    pub fn payload_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// 将落盘数据反序列化为该定义对应的具体类型
    pub fn decode(&self, data: Value) -> DomainResult<Box<dyn VersionedPayload>> {
        Ok((self.decode)(data)?)
    }
}

/// 从完整类型名推导 `(名称, 版本)`
///
/// `my_app::events::OldThingyPingedV2<T>` → `("ThingyPinged", 2)`
fn conventional_tag(full_type_name: &str) -> (String, u32) {
    let without_generics = full_type_name
        .split_once('<')
        .map_or(full_type_name, |(head, _)| head);
    let simple = without_generics
        .rsplit_once("::")
        .map_or(without_generics, |(_, tail)| tail);

    let mut name = simple
        .strip_prefix("Old")
        .filter(|rest| !rest.is_empty())
        .unwrap_or(simple);

    let mut version = 1;
    if let Some(idx) = name.rfind('V') {
        let digits = &name[idx + 1..];
        if idx > 0 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(parsed) = digits.parse::<u32>() {
                version = parsed;
                name = &name[..idx];
            }
        }
    }

    (name.to_string(), version)
}

/// 版本化类型注册表
///
/// 在启动阶段通过 `&mut self` 集中注册，之后以 `Arc<VersionedTypeRegistry>`
/// 共享只读访问。同一 `(名称, 版本)` 只保留首个注册的类型。
#[derive(Debug, Default)]
pub struct VersionedTypeRegistry {
    by_type: HashMap<TypeId, Arc<VersionedTypeDefinition>>,
    by_name: HashMap<String, BTreeMap<u32, Arc<VersionedTypeDefinition>>>,
}

impl VersionedTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式注册
    pub fn with<T: VersionedType>(mut self) -> Self {
        self.register::<T>();
        self
    }

    /// 注册一个类型，返回是否新增了定义
    pub fn register<T: VersionedType>(&mut self) -> bool {
        self.register_definition(VersionedTypeDefinition::of::<T>())
    }

    pub fn register_definition(&mut self, definition: VersionedTypeDefinition) -> bool {
        if self.by_type.contains_key(&definition.type_id) {
            return false;
        }

        let versions = self.by_name.entry(definition.name.clone()).or_default();
        if let Some(existing) = versions.get(&definition.version) {
            warn!(
                name = %definition.name,
                version = definition.version,
                registered = existing.type_name,
                ignored = definition.type_name,
                "duplicate versioned type tag, keeping first registration"
            );
            return false;
        }

        debug!(
            name = %definition.name,
            version = definition.version,
            type_name = definition.type_name,
            "versioned type registered"
        );
        let definition = Arc::new(definition);
        versions.insert(definition.version, Arc::clone(&definition));
        self.by_type.insert(definition.type_id, definition);
        true
    }

    /// 按具体类型查找
    pub fn definition_of<T: VersionedType>(&self) -> DomainResult<&Arc<VersionedTypeDefinition>> {
        self.by_type
            .get(&TypeId::of::<T>())
            .ok_or_else(|| DomainError::UnknownVersionedType {
                type_name: type_name::<T>().to_string(),
            })
    }

    /// 按载荷实例的运行时类型查找
    pub fn definition_for(
        &self,
        payload: &dyn VersionedPayload,
    ) -> DomainResult<&Arc<VersionedTypeDefinition>> {
        self.by_type
            .get(&payload.payload_type_id())
            .ok_or_else(|| DomainError::UnknownVersionedType {
                type_name: payload.payload_type_name().to_string(),
            })
    }

    /// 按 `(名称, 版本)` 查找
    pub fn get(&self, name: &str, version: u32) -> DomainResult<&Arc<VersionedTypeDefinition>> {
        self.by_name
            .get(name)
            .and_then(|versions| versions.get(&version))
            .ok_or_else(|| DomainError::UnknownVersionedName {
                name: name.to_string(),
                version,
            })
    }

    /// 同名且版本更高的定义，按版本升序
    pub fn newer_than(
        &self,
        definition: &VersionedTypeDefinition,
    ) -> impl Iterator<Item = &Arc<VersionedTypeDefinition>> {
        self.by_name
            .get(&definition.name)
            .into_iter()
            .flat_map(move |versions| {
                versions
                    .range((Bound::Excluded(definition.version), Bound::Unbounded))
                    .map(|(_, d)| d)
            })
    }

    /// 某名称下的最高版本
    pub fn latest(&self, name: &str) -> Option<&Arc<VersionedTypeDefinition>> {
        self.by_name
            .get(name)
            .and_then(|versions| versions.values().next_back())
    }

    /// 按标签反序列化（不做升级）
    pub fn decode(
        &self,
        name: &str,
        version: u32,
        data: Value,
    ) -> DomainResult<Box<dyn VersionedPayload>> {
        self.get(name, version)?.decode(data)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<VersionedTypeDefinition>> {
        self.by_name.values().flat_map(|versions| versions.values())
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
