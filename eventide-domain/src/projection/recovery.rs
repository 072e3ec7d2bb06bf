use super::envelope::ReadModelUpdate;
use crate::domain_event::ProjectedEvent;
use crate::error::DomainError;
use async_trait::async_trait;

/// 读模型更新失败与中断时的恢复钩子
#[async_trait]
pub trait ReadModelRecovery: Send + Sync {
    /// 返回 `true` 表示已处理该错误：跳过本次更新并继续
    async fn on_error(
        &self,
        read_model_id: &str,
        events: &[ProjectedEvent],
        error: &DomainError,
    ) -> bool;

    /// 取消导致未执行的更新
    async fn on_shutdown_recovery(&self, _pending: Vec<ReadModelUpdate>) {}
}
