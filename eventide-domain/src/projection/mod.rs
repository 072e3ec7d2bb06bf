//! 读模型投影（projection）
//!
//! 把已提交事件按目标读模型分组、排序后应用到读模型，并以比较并交换保存：
//! - `ReadModelStore`：获取、并发更新（冲突重试）、删除；
//! - `ReadModelApply`/`ReadModel`：调用方提供的应用逻辑；
//! - `ReadModelLocator`：事件到读模型标识的映射；
//! - `ReadModelDispatcher`/`ReadModelProjector`：提交后分发；
//! - `ReadModelPopulator`：从全局日志重建；
//! - `ProjectionRunner`：持续跟随全局日志的长驻任务。
//!
mod apply;
mod dispatcher;
mod envelope;
mod locator;
mod persistence;
mod populator;
mod recovery;
mod runner;
mod store;

pub use apply::{DefaultReadModelFactory, FoldReadModel, ReadModel, ReadModelApply, ReadModelFactory};
pub use dispatcher::{ReadModelDispatch, ReadModelDispatcher, ReadModelProjector};
pub use envelope::{ReadModelApplyResult, ReadModelContext, ReadModelEnvelope, ReadModelUpdate};
pub use locator::{AggregateIdLocator, ReadModelLocator, group_updates};
pub use persistence::{
    InMemoryReadModelPersistence, ReadModelCheckpoint, ReadModelPersistence, StoredReadModel,
};
pub use populator::ReadModelPopulator;
pub use recovery::ReadModelRecovery;
pub use runner::{ProjectionRunner, RunnerConfig, RunnerHandle};
pub use store::{ReadModelStore, ReadModelStoreConfig};
