//! 重试策略
//!
//! 按错误类型决定是否重试：
//! - `ConcurrencyConflictRetry`：仅针对乐观并发冲突，有限次数，带抖动退避；
//! - `TransientFaultRetry`：仅针对后端暂时不可用，指数退避，受次数与总耗时约束；
//!
//! 退避序列由 `backon::ExponentialBuilder` 生成。
//! - `NoRetry`：从不重试。
//!
//! 通用的 [`retry`] 循环由读模型更新与 `AggregateRoot` 共用。
//!
use crate::error::DomainError;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::error::Error;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

pub trait RetryStrategy: Send + Sync {
    /// `attempt` 为已失败的次数（从 1 开始），`elapsed` 为首次尝试以来的耗时
    fn should_retry(
        &self,
        error: &(dyn Error + 'static),
        elapsed: Duration,
        attempt: u32,
    ) -> RetryDecision;
}

// 来源字段为 `Box<DomainError>` 时，来源链上出现的是 Box 本身
fn as_domain_error<'a>(error: &'a (dyn Error + 'static)) -> Option<&'a DomainError> {
    error
        .downcast_ref::<DomainError>()
        .or_else(|| error.downcast_ref::<Box<DomainError>>().map(AsRef::as_ref))
}

/// 沿错误来源链查找 [`DomainError`]
pub fn find_domain_error<'a>(error: &'a (dyn Error + 'static)) -> Option<&'a DomainError> {
    let mut current = Some(error);
    while let Some(error) = current {
        if let Some(domain) = as_domain_error(error) {
            return Some(domain);
        }
        current = error.source();
    }
    None
}

/// 错误来源链上是否存在满足条件的 [`DomainError`]
pub fn domain_error_matches(
    error: &(dyn Error + 'static),
    predicate: impl Fn(&DomainError) -> bool,
) -> bool {
    let mut current = Some(error);
    while let Some(error) = current {
        if as_domain_error(error).is_some_and(&predicate) {
            return true;
        }
        current = error.source();
    }
    false
}

/// 在 `builder` 生成的退避序列中取第 `attempt` 次失败后的等待时间，序列耗尽时为 `None`
fn nth_delay(builder: ExponentialBuilder, attempt: u32) -> Option<Duration> {
    let index = usize::try_from(attempt.checked_sub(1)?).ok()?;
    builder.build().nth(index)
}

/// 并发冲突重试
///
/// 有限次数，带抖动的指数退避，等待时间落在 `[min_delay, max_delay]` 内。
#[derive(Debug, Clone)]
pub struct ConcurrencyConflictRetry {
    backoff: ExponentialBuilder,
    max_delay: Duration,
}

impl Default for ConcurrencyConflictRetry {
    fn default() -> Self {
        Self::new(4, Duration::from_millis(10), Duration::from_millis(100))
    }
}

impl ConcurrencyConflictRetry {
    pub fn new(max_retries: u32, min_delay: Duration, max_delay: Duration) -> Self {
        let max_delay = max_delay.max(min_delay);
        Self {
            backoff: ExponentialBuilder::default()
                .with_min_delay(min_delay)
                .with_max_delay(max_delay)
                .with_max_times(usize::try_from(max_retries).unwrap_or(usize::MAX))
                .with_jitter(),
            max_delay,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        nth_delay(self.backoff, attempt).map(|delay| delay.min(self.max_delay))
    }
}

impl RetryStrategy for ConcurrencyConflictRetry {
    fn should_retry(
        &self,
        error: &(dyn Error + 'static),
        _elapsed: Duration,
        attempt: u32,
    ) -> RetryDecision {
        if !domain_error_matches(error, DomainError::is_concurrency_conflict) {
            return RetryDecision::GiveUp;
        }
        match self.delay_for_attempt(attempt) {
            Some(delay) => RetryDecision::RetryAfter(delay),
            None => RetryDecision::GiveUp,
        }
    }
}

/// 暂时性故障重试（指数退避）
///
/// 除次数上限外还受总耗时约束：等待后会超出 `max_elapsed` 时放弃。
#[derive(Debug, Clone)]
pub struct TransientFaultRetry {
    backoff: ExponentialBuilder,
    max_elapsed: Duration,
}

impl Default for TransientFaultRetry {
    fn default() -> Self {
        Self::new(
            5,
            Duration::from_millis(50),
            Duration::from_secs(2),
            Duration::from_secs(10),
        )
    }
}

impl TransientFaultRetry {
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        max_elapsed: Duration,
    ) -> Self {
        Self {
            backoff: ExponentialBuilder::default()
                .with_min_delay(base_delay)
                .with_max_delay(max_delay.max(base_delay))
                .with_max_times(usize::try_from(max_retries).unwrap_or(usize::MAX)),
            max_elapsed,
        }
    }

    /// 第 `attempt` 次失败后的等待时间：`base * 2^(attempt-1)`，不超过上限
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        nth_delay(self.backoff, attempt)
    }
}

impl RetryStrategy for TransientFaultRetry {
    fn should_retry(
        &self,
        error: &(dyn Error + 'static),
        elapsed: Duration,
        attempt: u32,
    ) -> RetryDecision {
        if !domain_error_matches(error, DomainError::is_transient) {
            return RetryDecision::GiveUp;
        }
        match self.delay_for_attempt(attempt) {
            Some(delay) if elapsed.saturating_add(delay) <= self.max_elapsed => {
                RetryDecision::RetryAfter(delay)
            }
            _ => RetryDecision::GiveUp,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn should_retry(&self, _: &(dyn Error + 'static), _: Duration, _: u32) -> RetryDecision {
        RetryDecision::GiveUp
    }
}

/// 按策略重复执行 `op`，直到成功、策略放弃或被取消
///
/// 每次尝试前检查取消令牌；等待期间被取消时返回 `DomainError::Cancelled`。
pub async fn retry<T, E, F, Fut>(
    strategy: &dyn RetryStrategy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, E>
where
    E: Error + From<DomainError> + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled.into());
        }

        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        attempt += 1;
        let delay = match strategy.should_retry(&error, started.elapsed(), attempt) {
            RetryDecision::GiveUp => return Err(error),
            RetryDecision::RetryAfter(delay) => delay,
        };

        warn!(%error, attempt, delay = ?delay, "operation failed, retrying");
        tokio::select! {
            _ = cancel.cancelled() => return Err(DomainError::Cancelled.into()),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
