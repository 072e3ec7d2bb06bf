use super::envelope::{ReadModelApplyResult, ReadModelContext, ReadModelEnvelope};
use crate::domain_event::ProjectedEvent;
use crate::error::{DomainError, DomainResult};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// 把一组有序事件应用到读模型
#[async_trait]
pub trait ReadModelApply<R>: Send + Sync
where
    R: Send + Sync,
{
    async fn apply(
        &self,
        context: &mut ReadModelContext,
        events: &[ProjectedEvent],
        envelope: ReadModelEnvelope<R>,
    ) -> DomainResult<ReadModelApplyResult<R>>;
}

/// 逐条折叠事件的读模型
pub trait ReadModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 读模型名称，用于日志与投影器命名
    const NAME: &'static str;

    /// 应用一条事件，返回状态是否发生变化
    fn apply(&mut self, context: &mut ReadModelContext, event: &ProjectedEvent)
    -> DomainResult<bool>;
}

/// 以 [`ReadModel::apply`] 逐条折叠事件
#[derive(Debug, Clone, Copy, Default)]
pub struct FoldReadModel;

#[async_trait]
impl<R: ReadModel> ReadModelApply<R> for FoldReadModel {
    async fn apply(
        &self,
        context: &mut ReadModelContext,
        events: &[ProjectedEvent],
        mut envelope: ReadModelEnvelope<R>,
    ) -> DomainResult<ReadModelApplyResult<R>> {
        let Some(read_model) = envelope.read_model_mut() else {
            return Err(DomainError::InvalidState {
                reason: format!("read model {} has no state to fold into", R::NAME),
            });
        };

        let mut modified = false;
        for event in events {
            modified |= read_model.apply(context, event)?;
        }

        Ok(ReadModelApplyResult {
            envelope,
            is_modified: modified || context.is_marked_for_deletion(),
        })
    }
}

/// 读模型不存在时创建初始实例
#[async_trait]
pub trait ReadModelFactory<R>: Send + Sync {
    async fn create(&self, read_model_id: &str) -> DomainResult<R>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReadModelFactory;

#[async_trait]
impl<R: Default + Send + 'static> ReadModelFactory<R> for DefaultReadModelFactory {
    async fn create(&self, _read_model_id: &str) -> DomainResult<R> {
        Ok(R::default())
    }
}
