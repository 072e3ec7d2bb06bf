//! 读模型重建
//!
//! 从全局日志的起点按页读取，解码升级后交给投影器，用于新增读模型或
//! 修改折叠逻辑后的全量重建。
//!
use super::dispatcher::ReadModelDispatch;
use crate::error::DomainResult;
use crate::persist::{EventCodec, EventStore};
use crate::value_object::GlobalPosition;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub struct ReadModelPopulator {
    store: EventStore,
    codec: EventCodec,
    page_size: usize,
}

impl ReadModelPopulator {
    pub fn new(store: EventStore, codec: EventCodec) -> Self {
        let page_size = store.config().page_size;
        Self {
            store,
            codec,
            page_size,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// 把全局日志全部应用到读模型，返回读到的最后位置
    #[instrument(skip_all, fields(projector = projector.name()))]
    pub async fn populate(
        &self,
        projector: &dyn ReadModelDispatch,
        cancel: &CancellationToken,
    ) -> DomainResult<GlobalPosition> {
        let mut cursor = GlobalPosition::START;
        let mut applied = 0usize;

        loop {
            let page = self
                .store
                .load_all_page(cursor, self.page_size, cancel)
                .await?;

            if !page.events.is_empty() {
                let events = self.codec.project_all(&page.events)?;
                projector.dispatch(&events, cancel).await?;
                applied += events.len();
                debug!(applied, position = %page.next_position, "page populated");
            }

            cursor = page.next_position;
            if page.is_end {
                break;
            }
        }

        info!(applied, position = %cursor, "read model populated");
        Ok(cursor)
    }

    pub async fn purge(&self, projector: &dyn ReadModelDispatch) -> DomainResult<()> {
        info!(projector = projector.name(), "purging read model");
        projector.purge().await
    }

    /// 清空后重建
    pub async fn repopulate(
        &self,
        projector: &dyn ReadModelDispatch,
        cancel: &CancellationToken,
    ) -> DomainResult<GlobalPosition> {
        self.purge(projector).await?;
        self.populate(projector, cancel).await
    }
}
