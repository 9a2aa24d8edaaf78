use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::utils::GenerationError;

/// 限流与重试参数
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 两次调用之间的最小间隔
    pub min_interval: Duration,
    pub max_attempts: u32,
    /// 指数退避基数：base × 2^attempt
    pub base_delay: Duration,
    /// 限流错误没有给出等待时间时使用
    pub quota_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(3),
            max_attempts: 3,
            base_delay: Duration::from_secs(3),
            quota_wait: Duration::from_secs(30),
        }
    }
}

/// 所有生成式 AI 调用都经过这里
///
/// 上次调用时间是实例自有状态，不同实例互不影响。
/// 锁在等待期间一直持有，因此并发调用方也会按间隔串行放行。
pub struct RateLimitedExecutor {
    policy: RetryPolicy,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimitedExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            last_call: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn wait_for_slot(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.policy.min_interval {
                let wait = self.policy.min_interval - elapsed;
                info!("速率限制：等待 {}ms", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    /// 执行操作，失败时按策略重试，耗尽后返回最后一次的错误
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            self.wait_for_slot().await;

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            attempt += 1;
            warn!("AI 调用失败 (尝试 {}/{}): {}", attempt, attempts, error);

            if attempt >= attempts {
                return Err(error);
            }

            let wait = if error.is_rate_limited() {
                let wait = error.retry_after().unwrap_or(self.policy.quota_wait);
                warn!("配额受限，{}s 后重试", wait.as_secs_f32());
                wait
            } else {
                let backoff = self.policy.base_delay * 2u32.saturating_pow(attempt - 1);
                info!("退避 {}ms 后重试", backoff.as_millis());
                backoff
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            min_interval: Duration::ZERO,
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            quota_wait: Duration::from_millis(1),
        }
    }

    fn transient() -> GenerationError {
        GenerationError::Api { status: 503, message: "backend unavailable".into() }
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let executor = RateLimitedExecutor::new(fast_policy());
        let calls = AtomicU32::new(0);

        let result = executor
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transient())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_exhausting_attempts() {
        let executor = RateLimitedExecutor::new(fast_policy());
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(GenerationError::Validation(format!("attempt {}", n))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(GenerationError::Validation(msg)) => assert_eq!(msg, "attempt 2"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn honours_server_retry_hint_over_default_quota_wait() {
        let executor = RateLimitedExecutor::new(RetryPolicy {
            quota_wait: Duration::from_secs(600),
            ..fast_policy()
        });
        let calls = AtomicU32::new(0);

        let run = executor.run(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(GenerationError::Api {
                        status: 429,
                        message: "Quota exceeded. Please retry in 0s.".into(),
                    })
                } else {
                    Ok(n)
                }
            }
        });

        let result = tokio::time::timeout(Duration::from_secs(5), run).await;
        assert_eq!(result.expect("hint was ignored").unwrap(), 1);
    }

    #[tokio::test]
    async fn rate_limited_on_last_attempt_stops() {
        let executor = RateLimitedExecutor::new(RetryPolicy {
            max_attempts: 1,
            quota_wait: Duration::from_secs(600),
            ..fast_policy()
        });

        let run = executor.run(|| async {
            Err::<(), _>(GenerationError::Api { status: 429, message: "quota".into() })
        });

        let result = tokio::time::timeout(Duration::from_secs(5), run).await;
        assert!(result.expect("slept after final attempt").unwrap_err().is_rate_limited());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_after_each_failure() {
        let executor = RateLimitedExecutor::new(RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            ..fast_policy()
        });
        let calls = std::sync::Mutex::new(Vec::new());

        let started = Instant::now();
        let result: Result<(), _> = executor
            .run(|| {
                calls.lock().unwrap().push(started.elapsed());
                async { Err(transient()) }
            })
            .await;

        assert!(result.is_err());
        let calls = calls.into_inner().unwrap();
        let gaps: Vec<u64> = calls.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
        assert_eq!(gaps, vec![1, 2, 4]);
        assert_eq!(started.elapsed().as_secs(), 7);
    }

    #[tokio::test]
    async fn spaces_consecutive_calls_by_min_interval() {
        let executor = RateLimitedExecutor::new(RetryPolicy {
            min_interval: Duration::from_millis(80),
            ..fast_policy()
        });

        let started = Instant::now();
        executor.run(|| async { Ok::<_, GenerationError>(()) }).await.unwrap();
        executor.run(|| async { Ok::<_, GenerationError>(()) }).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn separate_executors_do_not_share_the_cursor() {
        let policy = RetryPolicy {
            min_interval: Duration::from_secs(600),
            ..fast_policy()
        };
        let first = RateLimitedExecutor::new(policy.clone());
        let second = RateLimitedExecutor::new(policy);

        first.run(|| async { Ok::<_, GenerationError>(()) }).await.unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            second.run(|| async { Ok::<_, GenerationError>(()) }),
        )
        .await;

        assert!(result.is_ok());
    }
}
