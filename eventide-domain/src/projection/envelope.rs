use crate::domain_event::ProjectedEvent;

/// 读模型及其存储版本
///
/// 未找到时 `read_model` 与 `version` 均为 `None`。
#[derive(Debug, Clone, PartialEq)]
pub struct ReadModelEnvelope<R> {
    read_model_id: String,
    read_model: Option<R>,
    version: Option<u64>,
}

impl<R> ReadModelEnvelope<R> {
    pub fn empty(read_model_id: impl Into<String>) -> Self {
        Self {
            read_model_id: read_model_id.into(),
            read_model: None,
            version: None,
        }
    }

    pub fn new(read_model_id: impl Into<String>, read_model: R, version: u64) -> Self {
        Self {
            read_model_id: read_model_id.into(),
            read_model: Some(read_model),
            version: Some(version),
        }
    }

    pub fn read_model_id(&self) -> &str {
        &self.read_model_id
    }

    pub fn read_model(&self) -> Option<&R> {
        self.read_model.as_ref()
    }

    pub fn read_model_mut(&mut self) -> Option<&mut R> {
        self.read_model.as_mut()
    }

    pub fn into_read_model(self) -> Option<R> {
        self.read_model
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.read_model.is_none()
    }

    /// 替换读模型，版本保持不变
    pub fn with_read_model(self, read_model: R) -> Self {
        Self {
            read_model: Some(read_model),
            ..self
        }
    }
}

/// 针对单个读模型的一组待应用事件，按 `(时间戳, 聚合序号)` 稳定排序
#[derive(Debug, Clone)]
pub struct ReadModelUpdate {
    read_model_id: String,
    events: Vec<ProjectedEvent>,
}

impl ReadModelUpdate {
    pub fn new(read_model_id: impl Into<String>, mut events: Vec<ProjectedEvent>) -> Self {
        events.sort_by_key(|e| (e.timestamp(), e.aggregate_sequence_number()));
        Self {
            read_model_id: read_model_id.into(),
            events,
        }
    }

    pub fn read_model_id(&self) -> &str {
        &self.read_model_id
    }

    pub fn events(&self) -> &[ProjectedEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ProjectedEvent> {
        self.events
    }
}

/// 一次应用过程的上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadModelContext {
    read_model_id: String,
    is_new: bool,
    marked_for_deletion: bool,
}

impl ReadModelContext {
    pub fn new(read_model_id: impl Into<String>, is_new: bool) -> Self {
        Self {
            read_model_id: read_model_id.into(),
            is_new,
            marked_for_deletion: false,
        }
    }

    pub fn read_model_id(&self) -> &str {
        &self.read_model_id
    }

    /// 读模型由工厂新建，尚未持久化
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// 应用完成后删除读模型而不是保存
    pub fn mark_for_deletion(&mut self) {
        self.marked_for_deletion = true;
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.marked_for_deletion
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadModelApplyResult<R> {
    pub envelope: ReadModelEnvelope<R>,
    pub is_modified: bool,
}

impl<R> ReadModelApplyResult<R> {
    pub fn modified(envelope: ReadModelEnvelope<R>) -> Self {
        Self {
            envelope,
            is_modified: true,
        }
    }

    pub fn unchanged(envelope: ReadModelEnvelope<R>) -> Self {
        Self {
            envelope,
            is_modified: false,
        }
    }
}
