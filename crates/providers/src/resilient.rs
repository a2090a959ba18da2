//! Resilient provider: per-attempt timeout plus a bounded retry policy.
//!
//! Every completion call made by the orchestrator goes through this wrapper,
//! so a stuck upstream can never stall a request forever. `max_retries = 0`
//! is a valid policy: one attempt, bounded by the timeout.

use async_trait::async_trait;
use promptwright_core::error::ProviderError;
use promptwright_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How many times to try, how long each try may take, and how long to wait between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    /// Delay before retry `n` is `n * backoff`, or the provider's
    /// `retry-after` when that is longer.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// One attempt, no retries.
    pub fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            attempt_timeout,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &promptwright_config::ProviderConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Wait before retry `retry`, never shorter than a rate limit asked for.
    fn delay_before(&self, retry: u32, previous: &ProviderError) -> Duration {
        let backoff = self.backoff * retry;
        match previous {
            ProviderError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry(Duration::from_secs(120))
    }
}

/// A provider that wraps another and applies a [`RetryPolicy`].
pub struct ResilientProvider {
    inner: Arc<dyn promptwright_core::Provider>,
    policy: RetryPolicy,
}

impl ResilientProvider {
    pub fn new(inner: Arc<dyn promptwright_core::Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl promptwright_core::Provider for ResilientProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let attempts = self.policy.max_retries + 1;
        let mut last_error = ProviderError::NotConfigured("No attempts made".into());

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.policy.delay_before(attempt - 1, &last_error);
                info!(
                    provider = %self.inner.name(),
                    attempt,
                    total = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying completion"
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.policy.attempt_timeout, self.inner.complete(request.clone()))
                .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    warn!(
                        provider = %self.inner.name(),
                        attempt,
                        error = %e,
                        "Completion attempt failed"
                    );
                    let retryable = e.is_retryable();
                    last_error = e;
                    if !retryable {
                        break;
                    }
                }
                Err(_) => {
                    warn!(
                        provider = %self.inner.name(),
                        attempt,
                        timeout_secs = self.policy.attempt_timeout.as_secs(),
                        "Completion attempt timed out"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {}s",
                        self.inner.name(),
                        self.policy.attempt_timeout.as_secs()
                    ));
                }
            }
        }

        Err(last_error)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        match tokio::time::timeout(self.policy.attempt_timeout, self.inner.health_check()).await {
            Ok(result) => result,
            Err(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptwright_core::Provider;
    use promptwright_core::message::Turn;
    use std::sync::Mutex;

    /// A mock provider that fails a fixed number of times, then succeeds.
    struct FlakyProvider {
        failures: Mutex<Vec<ProviderError>>,
        call_count: Mutex<usize>,
    }

    impl FlakyProvider {
        fn new(failures: Vec<ProviderError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                call_count: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl promptwright_core::Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok(ProviderResponse {
                    content: "success".into(),
                    usage: None,
                    model: "test-model".into(),
                })
            } else {
                Err(failures.remove(0))
            }
        }
    }

    /// A mock provider that hangs forever (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl promptwright_core::Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }

        async fn health_check(&self) -> Result<bool, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest::new("test", vec![Turn::user("hello")])
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            attempt_timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn zero_retries_fails_fast() {
        let inner = Arc::new(FlakyProvider::new(vec![ProviderError::Network(
            "conn refused".into(),
        )]));
        let provider = ResilientProvider::new(inner.clone(), policy(0));

        let result = provider.complete(test_request()).await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let inner = Arc::new(FlakyProvider::new(vec![
            ProviderError::Network("reset".into()),
            ProviderError::RateLimited {
                retry_after_secs: 1,
            },
        ]));
        let provider = ResilientProvider::new(inner.clone(), policy(2));

        let response = provider.complete(test_request()).await.unwrap();
        assert_eq!(response.content, "success");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(FlakyProvider::new(vec![
            ProviderError::Network("a".into()),
            ProviderError::Network("b".into()),
            ProviderError::Network("c".into()),
        ]));
        let provider = ResilientProvider::new(inner.clone(), policy(1));

        match provider.complete(test_request()).await.unwrap_err() {
            ProviderError::Network(msg) => assert_eq!(msg, "b"),
            other => panic!("Expected Network, got: {other:?}"),
        }
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_retry_waits_for_retry_after() {
        let inner = Arc::new(FlakyProvider::new(vec![ProviderError::RateLimited {
            retry_after_secs: 3,
        }]));
        let provider = ResilientProvider::new(inner.clone(), policy(1));

        let started = tokio::time::Instant::now();
        provider.complete(test_request()).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(inner.calls(), 2);
    }

    #[test]
    fn backoff_wins_when_longer_than_retry_after() {
        let policy = RetryPolicy {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(5),
            backoff: Duration::from_secs(2),
        };
        let limited = ProviderError::RateLimited {
            retry_after_secs: 1,
        };
        assert_eq!(policy.delay_before(3, &limited), Duration::from_secs(6));
        assert_eq!(
            policy.delay_before(1, &ProviderError::Network("x".into())),
            Duration::from_secs(2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_health_check_reports_unhealthy() {
        let provider = ResilientProvider::new(
            Arc::new(HangingProvider),
            RetryPolicy::no_retry(Duration::from_secs(1)),
        );
        assert!(!provider.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let inner = Arc::new(FlakyProvider::new(vec![
            ProviderError::AuthenticationFailed("bad key".into()),
        ]));
        let provider = ResilientProvider::new(inner.clone(), policy(3));

        let result = provider.complete(test_request()).await;
        assert!(matches!(result, Err(ProviderError::AuthenticationFailed(_))));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let provider = ResilientProvider::new(
            Arc::new(HangingProvider),
            RetryPolicy::no_retry(Duration::from_millis(50)),
        );

        match provider.complete(test_request()).await.unwrap_err() {
            ProviderError::Timeout(msg) => assert!(msg.contains("hanging")),
            other => panic!("Expected Timeout, got: {other:?}"),
        }
    }

    #[test]
    fn policy_from_config() {
        let config = promptwright_config::ProviderConfig {
            max_retries: 2,
            timeout_secs: 30,
            retry_backoff_ms: 250,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
        assert_eq!(
            policy.delay_before(2, &ProviderError::Timeout("t".into())),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn name_is_delegated() {
        let provider = ResilientProvider::new(
            Arc::new(FlakyProvider::new(vec![])),
            RetryPolicy::default(),
        );
        assert_eq!(provider.name(), "flaky");
        assert_eq!(provider.policy().max_retries, 0);
    }
}
