//! 事件到读模型的定位与分组
//!
use super::envelope::ReadModelUpdate;
use crate::domain_event::ProjectedEvent;
use std::collections::BTreeMap;

/// 事件影响的读模型标识（可以为空）
pub trait ReadModelLocator: Send + Sync {
    fn locate(&self, event: &ProjectedEvent) -> Vec<String>;
}

impl<F> ReadModelLocator for F
where
    F: Fn(&ProjectedEvent) -> Vec<String> + Send + Sync,
{
    fn locate(&self, event: &ProjectedEvent) -> Vec<String> {
        self(event)
    }
}

/// 每个聚合对应一个读模型，标识即聚合 ID
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateIdLocator;

impl ReadModelLocator for AggregateIdLocator {
    fn locate(&self, event: &ProjectedEvent) -> Vec<String> {
        vec![event.aggregate_id().to_string()]
    }
}

/// 按读模型分组事件，组内顺序由 [`ReadModelUpdate::new`] 决定
pub fn group_updates(
    locator: &dyn ReadModelLocator,
    events: &[ProjectedEvent],
) -> Vec<ReadModelUpdate> {
    let mut groups: BTreeMap<String, Vec<ProjectedEvent>> = BTreeMap::new();

    for event in events {
        let mut ids = locator.locate(event);
        ids.sort();
        ids.dedup();
        for id in ids {
            groups.entry(id).or_default().push(event.clone());
        }
    }

    groups
        .into_iter()
        .map(|(id, events)| ReadModelUpdate::new(id, events))
        .collect()
}
