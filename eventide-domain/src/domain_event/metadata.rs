use super::event_context::EventContext;
use bon::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 随事件落盘的元数据
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[builder(into)]
    #[serde(default)]
    event_id: String,
    #[builder(into)]
    #[serde(default)]
    aggregate_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    causation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extensions: Option<serde_json::Value>,
}

impl EventMetadata {
    /// 为一条新事件生成元数据（事件 ID 为随机 UUID）
    pub fn new(aggregate_type: &str, context: &EventContext) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            aggregate_type: aggregate_type.to_string(),
            correlation_id: context.correlation_id().map(str::to_string),
            causation_id: context.causation_id().map(str::to_string),
            actor_type: context.actor_type().map(str::to_string),
            actor_id: context.actor_id().map(str::to_string),
            extensions: context.extensions().cloned(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_the_context_and_a_fresh_id() {
        let context = EventContext::builder()
            .correlation_id("cor-1")
            .actor_type("user")
            .actor_id("u-1")
            .build();

        let a = EventMetadata::new("thingy", &context);
        let b = EventMetadata::new("thingy", &context);
        assert_ne!(a.event_id(), b.event_id());
        assert_eq!(a.correlation_id(), Some("cor-1"));
        assert_eq!(a.causation_id(), None);
        assert_eq!(a.actor_id(), Some("u-1"));

        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("causation_id").is_none());
        let back: EventMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }
}
