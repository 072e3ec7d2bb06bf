//! 版本化类型（Versioned Type）与升级链
//!
//! 事件与快照载荷以 `(名称, 版本)` 落盘。读取时先按标签定位具体类型并反序列化，
//! 再沿升级链逐版本转换到当前最新类型：
//!
//! - [`VersionedTypeRegistry`]：类型 ↔ `(名称, 版本)` 的双向映射
//! - [`UpgraderRegistry`]：以 `(当前类型, 下一类型)` 为键的单步升级器
//! - [`VersionedTypeUpgrader`]：串联上述两者，执行完整升级
//!
mod payload;
mod registry;
mod upgrader;

pub use payload::{VersionedPayload, VersionedTag, VersionedType};
pub use registry::{VersionedTypeDefinition, VersionedTypeRegistry};
pub use upgrader::{TypeUpgrader, UpgraderRegistry, VersionedTypeUpgrader};
