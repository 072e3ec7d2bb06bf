//! 领域事件（Domain Event）
//!
//! 定义聚合事件集合需要实现的接口（`DomainEvent`）、随事件落盘的元数据
//! （`EventMetadata`，由调用方的 `EventContext` 生成），以及投影阶段使用的
//! 已解码事件 `ProjectedEvent`。

mod domain_event_trait;
mod event_context;
mod metadata;
mod projected_event;

pub use domain_event_trait::DomainEvent;
pub use event_context::EventContext;
pub use metadata::EventMetadata;
pub use projected_event::ProjectedEvent;
