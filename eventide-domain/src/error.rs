//! 领域层统一错误定义
//!
//! 覆盖版本化类型与上抬、事件存储、读模型投影、基础设施与命令校验，
//! 各实现层统一转换为 `DomainError`，重试策略据此判断是否可重试。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/版本化类型 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("versioned type not registered: {type_name}")]
    UnknownVersionedType { type_name: String },
    #[error("no versioned type registered as {name} v{version}")]
    UnknownVersionedName { name: String, version: u32 },
    #[error("no upgrader registered for {name} v{from_version} -> v{to_version}")]
    UpgradeChainBroken {
        name: String,
        from_version: u32,
        to_version: u32,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 事件存储 ---
    #[error(
        "concurrency conflict on stream {stream}: expected version {expected}, actual {actual}; reload and retry"
    )]
    ConcurrencyConflict {
        stream: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid event batch: {reason}")]
    InvalidEventBatch { reason: String },

    // --- 读模型 ---
    #[error(
        "read model {read_model_id} was modified concurrently: expected version {expected:?}, actual {actual:?}"
    )]
    ReadModelConflict {
        read_model_id: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },
    #[error("failed to apply events to read model {read_model_id}: {source}")]
    ReadModelApply {
        read_model_id: String,
        #[source]
        source: Box<DomainError>,
    },

    // --- 基础设施 ---
    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },
    #[error("operation cancelled")]
    Cancelled,

    // --- 领域规则/命令与状态 ---
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },
}

impl DomainError {
    /// 后端暂不可用
    pub fn backend_unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        DomainError::BackendUnavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// 事件流或读模型的乐观并发冲突
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::ConcurrencyConflict { .. } | DomainError::ReadModelConflict { .. }
        )
    }

    /// 可通过退避重试恢复的瞬时故障
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::BackendUnavailable { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

// ---- Cross-crate conversions for infrastructure convenience ----

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DomainError::NotFound {
                reason: "row not found".to_string(),
            },
            other => DomainError::backend_unavailable("sqlx", other.to_string()),
        }
    }
}
