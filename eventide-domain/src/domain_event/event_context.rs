use super::projected_event::ProjectedEvent;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 调用方在提交时提供的上下文，逐条复制进事件元数据
///
/// 追踪链路：`correlation_id` 在一次业务流程中保持不变，
/// `causation_id` 指向直接触发本次提交的消息或事件。
#[derive(Builder, Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    #[builder(into)]
    correlation_id: Option<String>,
    #[builder(into)]
    causation_id: Option<String>,
    /// 主体类型，例如 user、system
    #[builder(into)]
    actor_type: Option<String>,
    #[builder(into)]
    actor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extensions: Option<serde_json::Value>,
}

impl EventContext {
    /// 由一条已提交事件触发的后续提交：沿用其关联 ID（缺失时以事件 ID 开启新链路），
    /// 因果 ID 为该事件 ID，主体信息一并继承
    pub fn caused_by(event: &ProjectedEvent) -> Self {
        let metadata = event.metadata();
        let event_id = metadata.event_id().to_string();
        Self {
            correlation_id: Some(
                metadata
                    .correlation_id()
                    .map_or_else(|| event_id.clone(), str::to_string),
            ),
            causation_id: Some(event_id),
            actor_type: metadata.actor_type().map(str::to_string),
            actor_id: metadata.actor_id().map(str::to_string),
            extensions: None,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn causation_id(&self) -> Option<&str> {
        self.causation_id.as_deref()
    }

    pub fn actor_type(&self) -> Option<&str> {
        self.actor_type.as_deref()
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn extensions(&self) -> Option<&serde_json::Value> {
        self.extensions.as_ref()
    }
}
