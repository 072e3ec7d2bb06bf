//! eventide 的过程宏
//!
//! - `#[entity]`：为聚合/实体补齐 `id` 与 `version` 字段并实现 `Entity`
//! - `#[entity_id]`：单字段标识包装类型
//! - `#[versioned]`：把结构体或枚举声明为可演进的版本化载荷
//! - `#[domain_event]`：由版本化载荷组成的领域事件枚举
//! - `#[value_object]`：值对象派生集合
//!
//! 生成代码统一通过 `::eventide_domain` 路径引用运行时类型。

use proc_macro::TokenStream;

mod domain_event;
mod entity;
mod entity_id;
mod utils;
mod value_object;
mod versioned;

/// 实体宏
/// - 追加字段：`id: IdType`, `version: Version`（若缺失）并置于字段最前
/// - 自动实现 `::eventide_domain::entity::Entity`（`new/id/version/set_version`）
/// - 支持参数：`#[entity(id = IdType, debug = true|false)]`，id 默认 `String`
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 标识宏：`#[entity_id] struct AccountId(String);`
#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}

/// 版本化载荷宏
///
/// ```ignore
/// #[versioned]
/// struct ThingyPingedV2 { note: String }            // ("ThingyPinged", 2)
///
/// #[versioned(name = "thingy-pinged", version = 3)]
/// struct ThingyPinged { note: String, at: u64 }
/// ```
#[proc_macro_attribute]
pub fn versioned(attr: TokenStream, item: TokenStream) -> TokenStream {
    versioned::expand(attr, item)
}

/// 领域事件宏：每个变体包装一个 `#[versioned]` 载荷
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}

/// 值对象宏：`#[value_object(debug = true|false, ordered = true|false)]`
///
/// 单字段元组结构体按内部值序列化。
#[proc_macro_attribute]
pub fn value_object(attr: TokenStream, item: TokenStream) -> TokenStream {
    value_object::expand(attr, item)
}
