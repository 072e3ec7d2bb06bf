use super::payload::{VersionedPayload, VersionedType};
use super::registry::VersionedTypeRegistry;
use crate::error::{DomainError, DomainResult};
use serde_json::Value;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// 单步升级器：把 `From` 转换为同名的下一个版本 `To`
pub trait TypeUpgrader<From, To>: Send + Sync {
    fn upgrade(&self, from: From) -> DomainResult<To>;
}

impl<From, To, T> TypeUpgrader<From, To> for Arc<T>
where
    T: TypeUpgrader<From, To> + ?Sized,
{
    fn upgrade(&self, from: From) -> DomainResult<To> {
        (**self).upgrade(from)
    }
}

trait ErasedUpgrader: Send + Sync {
    fn upgrade_erased(&self, from: Box<dyn Any + Send>) -> DomainResult<Box<dyn VersionedPayload>>;
}

struct Typed<U, From, To> {
    inner: U,
    _marker: PhantomData<fn(From) -> To>,
}

impl<U, From, To> ErasedUpgrader for Typed<U, From, To>
where
    U: TypeUpgrader<From, To>,
    From: VersionedType,
    To: VersionedType,
{
    fn upgrade_erased(&self, from: Box<dyn Any + Send>) -> DomainResult<Box<dyn VersionedPayload>> {
        let from = from
            .downcast::<From>()
            .map_err(|_| DomainError::TypeMismatch {
                expected: type_name::<From>().to_string(),
                found: "unknown payload".to_string(),
            })?;
        Ok(Box::new(self.inner.upgrade(*from)?))
    }
}

struct FnUpgrader<F>(F);

impl<F, From, To> TypeUpgrader<From, To> for FnUpgrader<F>
where
    F: Fn(From) -> DomainResult<To> + Send + Sync,
{
    fn upgrade(&self, from: From) -> DomainResult<To> {
        (self.0)(from)
    }
}

/// 以 `(当前类型, 下一类型)` 为键的升级器集合
///
/// 只登记相邻版本之间的升级器，不支持跨版本跳跃。
#[derive(Default)]
pub struct UpgraderRegistry {
    upgraders: HashMap<(TypeId, TypeId), Arc<dyn ErasedUpgrader>>,
}

impl UpgraderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<From, To, U>(&mut self, upgrader: U) -> &mut Self
    where
        From: VersionedType,
        To: VersionedType,
        U: TypeUpgrader<From, To> + 'static,
    {
        let erased: Arc<dyn ErasedUpgrader> = Arc::new(Typed::<U, From, To> {
            inner: upgrader,
            _marker: PhantomData,
        });
        self.upgraders
            .insert((TypeId::of::<From>(), TypeId::of::<To>()), erased);
        self
    }

    /// 以闭包注册升级器
    pub fn register_fn<From, To, F>(&mut self, upgrade: F) -> &mut Self
    where
        From: VersionedType,
        To: VersionedType,
        F: Fn(From) -> DomainResult<To> + Send + Sync + 'static,
    {
        self.register::<From, To, _>(FnUpgrader(upgrade))
    }

    fn get(&self, from: TypeId, to: TypeId) -> Option<&Arc<dyn ErasedUpgrader>> {
        self.upgraders.get(&(from, to))
    }

    pub fn len(&self) -> usize {
        self.upgraders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upgraders.is_empty()
    }
}

impl std::fmt::Debug for UpgraderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgraderRegistry")
            .field("upgraders", &self.upgraders.len())
            .finish()
    }
}

/// 版本化类型升级器
///
/// 给定任意版本的载荷，沿同名更高版本依次调用单步升级器，
/// 返回最高版本的载荷；已是最高版本时原样返回。
#[derive(Debug, Clone)]
pub struct VersionedTypeUpgrader {
    types: Arc<VersionedTypeRegistry>,
    upgraders: Arc<UpgraderRegistry>,
}

impl VersionedTypeUpgrader {
    pub fn new(types: Arc<VersionedTypeRegistry>, upgraders: Arc<UpgraderRegistry>) -> Self {
        Self { types, upgraders }
    }

    pub fn types(&self) -> &Arc<VersionedTypeRegistry> {
        &self.types
    }

    pub fn upgrade(
        &self,
        instance: Box<dyn VersionedPayload>,
    ) -> DomainResult<Box<dyn VersionedPayload>> {
        let start = self.types.definition_for(instance.as_ref())?;
        let chain: Vec<_> = self.types.newer_than(start).cloned().collect();
        if chain.is_empty() {
            return Ok(instance);
        }

        let mut current = Arc::clone(start);
        let mut value = instance;
        for next in chain {
            let upgrader = self
                .upgraders
                .get(current.payload_type_id(), next.payload_type_id())
                .ok_or_else(|| DomainError::UpgradeChainBroken {
                    name: current.name().to_string(),
                    from_version: current.version(),
                    to_version: next.version(),
                })?;
            trace!(
                name = current.name(),
                from = current.version(),
                to = next.version(),
                "upgrading versioned payload"
            );
            value = upgrader.upgrade_erased(value.into_any())?;
            current = next;
        }
        Ok(value)
    }

    /// 升级并取出指定的具体类型
    pub fn upgrade_as<T: VersionedType>(&self, instance: Box<dyn VersionedPayload>) -> DomainResult<T> {
        let upgraded = self.upgrade(instance)?;
        let found = upgraded.payload_type_name();
        upgraded
            .into_any()
            .downcast::<T>()
            .map(|typed| *typed)
            .map_err(|_| DomainError::TypeMismatch {
                expected: type_name::<T>().to_string(),
                found: found.to_string(),
            })
    }

    /// 按标签反序列化落盘数据并升级到最新版本
    pub fn decode(
        &self,
        name: &str,
        version: u32,
        data: Value,
    ) -> DomainResult<Box<dyn VersionedPayload>> {
        let payload = self.types.decode(name, version, data)?;
        self.upgrade(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_macros::versioned;

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

    struct V2ToV3;

    impl TypeUpgrader<ThingyPingedV2, ThingyPingedV3> for V2ToV3 {
        fn upgrade(&self, from: ThingyPingedV2) -> DomainResult<ThingyPingedV3> {
            Ok(ThingyPingedV3 {
                text: from.message,
                count: from.count,
                source: "legacy".to_string(),
            })
        }
    }

    fn upgrader(with_v2_to_v3: bool) -> VersionedTypeUpgrader {
        let types = VersionedTypeRegistry::new()
            .with::<ThingyPingedV1>()
            .with::<ThingyPingedV2>()
            .with::<ThingyPingedV3>();

        let mut upgraders = UpgraderRegistry::new();
        upgraders.register_fn(|v1: ThingyPingedV1| {
            Ok(ThingyPingedV2 {
                message: v1.message,
                count: 1,
            })
        });
        if with_v2_to_v3 {
            upgraders.register::<ThingyPingedV2, ThingyPingedV3, _>(V2ToV3);
        }

        VersionedTypeUpgrader::new(Arc::new(types), Arc::new(upgraders))
    }

    #[test]
    fn walks_every_intermediate_version() {
        let upgrader = upgrader(true);
        let v1 = ThingyPingedV1 {
            message: "ping".into(),
        };

        let v3: ThingyPingedV3 = upgrader.upgrade_as(Box::new(v1)).unwrap();
        assert_eq!(
            v3,
            ThingyPingedV3 {
                text: "ping".into(),
                count: 1,
                source: "legacy".into(),
            }
        );
    }

    #[test]
    fn single_step_is_keyed_by_the_payload_types() {
        let types = Arc::new(
            VersionedTypeRegistry::new()
                .with::<ThingyPingedV1>()
                .with::<ThingyPingedV2>(),
        );
        let v1 = types.definition_of::<ThingyPingedV1>().unwrap();
        assert_eq!(v1.payload_type_id(), TypeId::of::<ThingyPingedV1>());

        let mut upgraders = UpgraderRegistry::new();
        upgraders.register_fn(|v1: ThingyPingedV1| {
            Ok(ThingyPingedV2 {
                message: v1.message,
                count: 7,
            })
        });
        let upgrader = VersionedTypeUpgrader::new(types, Arc::new(upgraders));

        let v2: ThingyPingedV2 = upgrader
            .upgrade_as(Box::new(ThingyPingedV1 {
                message: "hi".into(),
            }))
            .unwrap();
        assert_eq!(v2.count, 7);
        assert_eq!(v2.message, "hi");
    }

    #[test]
    fn latest_version_is_returned_unchanged() {
        let upgrader = upgrader(true);
        let v3 = ThingyPingedV3 {
            text: "t".into(),
            count: 9,
            source: "s".into(),
        };

        let once: ThingyPingedV3 = upgrader.upgrade_as(Box::new(v3.clone())).unwrap();
        let twice: ThingyPingedV3 = upgrader.upgrade_as(Box::new(once.clone())).unwrap();
        assert_eq!(once, v3);
        assert_eq!(twice, v3);
    }

    #[test]
    fn missing_step_breaks_the_chain() {
        let upgrader = upgrader(false);
        let err = upgrader
            .upgrade(Box::new(ThingyPingedV1 {
                message: "ping".into(),
            }))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::UpgradeChainBroken {
                from_version: 2,
                to_version: 3,
                ..
            }
        ));
    }

    #[test]
    fn decode_then_upgrade_stored_payload() {
        let upgrader = upgrader(true);
        let payload = upgrader
            .decode("ThingyPinged", 2, serde_json::json!({ "message": "m", "count": 4 }))
            .unwrap();
        let v3 = payload.downcast_ref::<ThingyPingedV3>().unwrap();
        assert_eq!(v3.count, 4);
        assert_eq!(v3.text, "m");
    }

    #[test]
    fn unregistered_payload_is_rejected() {
        #[versioned]
        struct Stranger {
            x: u8,
        }

        let upgrader = upgrader(true);
        let err = upgrader.upgrade(Box::new(Stranger { x: 1 })).unwrap_err();
        assert!(matches!(err, DomainError::UnknownVersionedType { .. }));
    }
}
