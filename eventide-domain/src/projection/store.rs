//! 读模型存储（ReadModelStore）
//!
//! 每个更新独立执行“读取 → 创建 → 应用 → 比较并交换”，冲突时按重试策略
//! 从读取重新开始。多个更新以有界并发执行。
//!
use super::apply::{DefaultReadModelFactory, ReadModelApply, ReadModelFactory};
use super::envelope::{ReadModelContext, ReadModelEnvelope, ReadModelUpdate};
use super::persistence::{ReadModelCheckpoint, ReadModelPersistence, StoredReadModel};
use super::recovery::ReadModelRecovery;
use crate::domain_event::ProjectedEvent;
use crate::error::{DomainError, DomainResult};
use crate::retry::{ConcurrencyConflictRetry, RetryStrategy, retry};
use bon::Builder;
use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::any::type_name;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

/// 读模型存储配置
#[derive(Debug, Clone, Builder, Deserialize)]
#[serde(default)]
pub struct ReadModelStoreConfig {
    /// 一次 `update` 中同时处理的读模型数
    #[builder(default = 8)]
    pub update_concurrency: usize,
}

impl Default for ReadModelStoreConfig {
    fn default() -> Self {
        Self {
            update_concurrency: 8,
        }
    }
}

enum UpdateOutcome {
    Done,
    NotApplied(ReadModelUpdate),
    Failed(DomainError),
}

pub struct ReadModelStore<R> {
    persistence: Arc<dyn ReadModelPersistence>,
    factory: Arc<dyn ReadModelFactory<R>>,
    retry: Arc<dyn RetryStrategy>,
    recovery: Option<Arc<dyn ReadModelRecovery>>,
    config: ReadModelStoreConfig,
}

impl<R> ReadModelStore<R>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(persistence: Arc<dyn ReadModelPersistence>) -> Self
    where
        R: Default,
    {
        Self::with_factory(persistence, Arc::new(DefaultReadModelFactory))
    }

    pub fn with_factory(
        persistence: Arc<dyn ReadModelPersistence>,
        factory: Arc<dyn ReadModelFactory<R>>,
    ) -> Self {
        Self {
            persistence,
            factory,
            retry: Arc::new(ConcurrencyConflictRetry::default()),
            recovery: None,
            config: ReadModelStoreConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: Arc<dyn RetryStrategy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_recovery(mut self, recovery: Arc<dyn ReadModelRecovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn with_config(mut self, config: ReadModelStoreConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn get(&self, read_model_id: &str) -> DomainResult<ReadModelEnvelope<R>> {
        match self.persistence.get(read_model_id).await? {
            Some(stored) => Ok(ReadModelEnvelope::new(
                read_model_id,
                serde_json::from_value(stored.value)?,
                stored.version,
            )),
            None => Ok(ReadModelEnvelope::empty(read_model_id)),
        }
    }

    pub async fn delete(&self, read_model_id: &str) -> DomainResult<()> {
        self.persistence.delete(read_model_id).await
    }

    pub async fn delete_all(&self) -> DomainResult<()> {
        debug!(read_model = type_name::<R>(), "deleting all read models");
        self.persistence.delete_all().await
    }

    /// 应用一批更新
    ///
    /// 取消时尚未生效的更新交给恢复钩子的 `on_shutdown_recovery`，随后返回
    /// `DomainError::Cancelled`。否则返回第一个未被恢复钩子处理的错误。
    #[instrument(skip_all, fields(read_model = type_name::<R>(), updates = updates.len()))]
    pub async fn update(
        &self,
        updates: Vec<ReadModelUpdate>,
        applier: &dyn ReadModelApply<R>,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let outcomes: Vec<UpdateOutcome> = stream::iter(updates)
            .map(|update| self.run_update(update, applier, cancel))
            .buffer_unordered(self.config.update_concurrency.max(1))
            .collect()
            .await;

        let mut pending = Vec::new();
        let mut first_error = None;
        for outcome in outcomes {
            match outcome {
                UpdateOutcome::Done => {}
                UpdateOutcome::NotApplied(update) => pending.push(update),
                UpdateOutcome::Failed(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }

        if !pending.is_empty() {
            warn!(pending = pending.len(), "read model update cancelled");
            if let Some(recovery) = &self.recovery {
                recovery.on_shutdown_recovery(pending).await;
            }
            return Err(DomainError::Cancelled);
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn run_update(
        &self,
        update: ReadModelUpdate,
        applier: &dyn ReadModelApply<R>,
        cancel: &CancellationToken,
    ) -> UpdateOutcome {
        if cancel.is_cancelled() {
            return UpdateOutcome::NotApplied(update);
        }

        let this = self;
        let target = &update;
        let result = retry(this.retry.as_ref(), cancel, move || {
            this.update_cycle(target, applier)
        })
        .await;

        match result {
            Ok(()) => UpdateOutcome::Done,
            Err(DomainError::Cancelled) => UpdateOutcome::NotApplied(update),
            Err(error @ DomainError::ReadModelApply { .. }) => {
                let recovered = match &self.recovery {
                    Some(recovery) => {
                        recovery
                            .on_error(update.read_model_id(), update.events(), &error)
                            .await
                    }
                    None => false,
                };
                if recovered {
                    warn!(read_model_id = update.read_model_id(), %error, "apply error recovered, update skipped");
                    UpdateOutcome::Done
                } else {
                    UpdateOutcome::Failed(error)
                }
            }
            Err(error) => UpdateOutcome::Failed(error),
        }
    }

    async fn update_cycle(
        &self,
        update: &ReadModelUpdate,
        applier: &dyn ReadModelApply<R>,
    ) -> DomainResult<()> {
        let read_model_id = update.read_model_id();
        let (envelope, mut checkpoint) = match self.persistence.get(read_model_id).await? {
            Some(stored) => (
                ReadModelEnvelope::new(
                    read_model_id,
                    serde_json::from_value(stored.value)?,
                    stored.version,
                ),
                stored.checkpoint,
            ),
            None => (
                ReadModelEnvelope::empty(read_model_id),
                ReadModelCheckpoint::default(),
            ),
        };
        let read_version = envelope.version();

        let events: Vec<ProjectedEvent> = update
            .events()
            .iter()
            .filter(|event| !checkpoint.covers(event))
            .cloned()
            .collect();
        if events.is_empty() {
            trace!(read_model_id, "events already applied");
            return Ok(());
        }

        let mut context = ReadModelContext::new(read_model_id, envelope.is_empty());
        let envelope = if envelope.is_empty() {
            envelope.with_read_model(self.factory.create(read_model_id).await?)
        } else {
            envelope
        };

        let result = applier
            .apply(&mut context, &events, envelope)
            .await
            .map_err(|source| DomainError::ReadModelApply {
                read_model_id: read_model_id.to_string(),
                source: Box::new(source),
            })?;

        if !result.is_modified {
            trace!(read_model_id, "read model unchanged");
            return Ok(());
        }

        if context.is_marked_for_deletion() {
            debug!(read_model_id, "read model deleted by apply");
            return self.persistence.delete(read_model_id).await;
        }

        let Some(read_model) = result.envelope.into_read_model() else {
            return Err(DomainError::InvalidState {
                reason: format!("apply returned no state for read model {read_model_id}"),
            });
        };

        events.iter().for_each(|event| checkpoint.record(event));
        let new_version = read_version.map_or(1, |version| version + 1);
        self.persistence
            .compare_and_swap(
                read_model_id,
                read_version,
                StoredReadModel::new(serde_json::to_value(&read_model)?, new_version)
                    .with_checkpoint(checkpoint),
            )
            .await?;

        trace!(read_model_id, new_version, "read model saved");
        Ok(())
    }
}
