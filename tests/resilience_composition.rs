//! End-to-end behavior of resilience-wrapped providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use provider_kit::config::{
    BulkheadConfig, CircuitBreakerConfig, RateLimiterConfig, ResilienceConfig, RetryConfig,
};
use provider_kit::error::{as_domain, is_sentinel, ErrorCode};
use provider_kit::{
    with_resilience, BoxError, Context, ContextError, Provider, RequestResponse, ResilienceError,
};
use tokio::sync::Notify;

mod common;
use common::{shared, ScriptedProvider};

fn retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff_ms: 10,
        max_backoff_ms: 50,
        ..Default::default()
    }
}

fn breaker(max_failures: u32) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        max_failures,
        timeout_ms: 1_000,
        half_open_max_requests: 1,
    }
}

#[tokio::test]
async fn test_empty_config_is_passthrough() {
    let provider = shared(&ScriptedProvider::new("p"));
    let wrapped = with_resilience(provider.clone(), &ResilienceConfig::default());
    assert!(Arc::ptr_eq(&wrapped, &provider));
}

#[tokio::test(start_paused = true)]
async fn test_retry_succeeds_after_n_failures() {
    let provider = ScriptedProvider::failing_first("p", 2);
    let wrapped = with_resilience(
        shared(&provider),
        &ResilienceConfig::default().with_retry(retry(3)),
    );

    let out = wrapped.execute(&Context::background(), "q".into()).await.unwrap();
    assert_eq!(out, "p:q");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_max_attempts() {
    let provider = ScriptedProvider::failing_first("p", 5);
    let wrapped = with_resilience(
        shared(&provider),
        &ResilienceConfig::default().with_retry(retry(3)),
    );

    let err = wrapped.execute(&Context::background(), "q".into()).await.unwrap_err();
    assert_eq!(err.to_string(), "p failed call 3");
    assert!(as_domain(err.as_ref()).is_none());
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_predicate_stops_early() {
    let provider = ScriptedProvider::failing_first("p", 5);
    let config = ResilienceConfig::default()
        .with_retry(retry(5).with_predicate(|e| !e.to_string().contains("call 2")));
    let wrapped = with_resilience(shared(&provider), &config);

    wrapped.execute(&Context::background(), "q".into()).await.unwrap_err();
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_breaker_rejects_after_max_failures() {
    let provider = ScriptedProvider::new("p");
    provider.set_always_fail(true);
    let wrapped = with_resilience(
        shared(&provider),
        &ResilienceConfig::default().with_circuit_breaker(breaker(3)),
    );
    let ctx = Context::background();

    for n in 1..=3 {
        let err = wrapped.execute(&ctx, "q".into()).await.unwrap_err();
        assert_eq!(err.to_string(), format!("p failed call {n}"));
    }

    let err = wrapped.execute(&ctx, "q".into()).await.unwrap_err();
    assert_eq!(provider.calls(), 3);
    let domain = as_domain(err.as_ref()).unwrap();
    assert_eq!(domain.code, ErrorCode::Unavailable);
    assert!(domain.retryable);
    assert!(is_sentinel(err.as_ref(), ResilienceError::CircuitOpen));
}

#[tokio::test(start_paused = true)]
async fn test_breaker_recovers_after_timeout() {
    let provider = ScriptedProvider::new("p");
    provider.set_always_fail(true);
    let wrapped = with_resilience(
        shared(&provider),
        &ResilienceConfig::default().with_circuit_breaker(breaker(1)),
    );
    let ctx = Context::background();

    wrapped.execute(&ctx, "q".into()).await.unwrap_err();
    wrapped.execute(&ctx, "q".into()).await.unwrap_err();
    assert_eq!(provider.calls(), 1);

    provider.set_always_fail(false);
    tokio::time::advance(Duration::from_millis(1_001)).await;
    assert_eq!(wrapped.execute(&ctx, "q".into()).await.unwrap(), "p:q");
    assert_eq!(wrapped.execute(&ctx, "r".into()).await.unwrap(), "p:r");
}

#[tokio::test(start_paused = true)]
async fn test_retries_nested_inside_breaker() {
    let provider = ScriptedProvider::failing_first("p", 1);
    let config = ResilienceConfig::default()
        .with_circuit_breaker(breaker(1))
        .with_retry(retry(3));
    let wrapped = with_resilience(shared(&provider), &config);
    let ctx = Context::background();

    // A single-failure breaker would open if the retried failure counted.
    assert_eq!(wrapped.execute(&ctx, "a".into()).await.unwrap(), "p:a");
    assert_eq!(wrapped.execute(&ctx, "b".into()).await.unwrap(), "p:b");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_is_timeout() {
    let provider = ScriptedProvider::failing_first("p", 10);
    let config = ResilienceConfig::default().with_retry(RetryConfig {
        max_attempts: 10,
        initial_backoff_ms: 10_000,
        max_backoff_ms: 10_000,
        ..Default::default()
    });
    let wrapped = with_resilience(shared(&provider), &config);
    let ctx = Context::background().with_timeout(Duration::from_millis(500));

    let err = wrapped.execute(&ctx, "q".into()).await.unwrap_err();
    assert_eq!(provider.calls(), 1);
    let domain = as_domain(err.as_ref()).unwrap();
    assert_eq!(domain.code, ErrorCode::Timeout);
    assert!(is_sentinel(err.as_ref(), ContextError::DeadlineExceeded));
}

#[tokio::test]
async fn test_rate_limiter_exhaustion_is_translated() {
    let provider = ScriptedProvider::new("p");
    let config = ResilienceConfig::default().with_rate_limiter(RateLimiterConfig {
        rate: 0.0,
        burst: 2,
    });
    let wrapped = with_resilience(shared(&provider), &config);
    let ctx = Context::background();

    wrapped.execute(&ctx, "a".into()).await.unwrap();
    wrapped.execute(&ctx, "b".into()).await.unwrap();
    let err = wrapped.execute(&ctx, "c".into()).await.unwrap_err();
    assert_eq!(as_domain(err.as_ref()).unwrap().code, ErrorCode::RateLimited);
    assert!(is_sentinel(err.as_ref(), ResilienceError::RateLimited));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_bulkhead_rejects_when_full() {
    struct Blocking {
        release: Notify,
    }

    #[async_trait]
    impl Provider for Blocking {
        fn name(&self) -> &str {
            "blocking"
        }

        async fn is_available(&self, _ctx: &Context) -> bool {
            true
        }
    }

    #[async_trait]
    impl RequestResponse<String, String> for Blocking {
        async fn execute(&self, _ctx: &Context, input: String) -> Result<String, BoxError> {
            self.release.notified().await;
            Ok(input)
        }
    }

    let provider = Arc::new(Blocking {
        release: Notify::new(),
    });
    let config = ResilienceConfig::default().with_bulkhead(BulkheadConfig {
        max_concurrent: 1,
        max_wait_ms: 0,
    });
    let wrapped = with_resilience(
        provider.clone() as Arc<dyn RequestResponse<String, String>>,
        &config,
    );

    let busy = {
        let wrapped = wrapped.clone();
        tokio::spawn(async move { wrapped.execute(&Context::background(), "first".into()).await })
    };
    tokio::task::yield_now().await;

    let err = wrapped
        .execute(&Context::background(), "second".into())
        .await
        .unwrap_err();
    assert_eq!(as_domain(err.as_ref()).unwrap().code, ErrorCode::ResourceExhausted);
    assert!(is_sentinel(err.as_ref(), ResilienceError::BulkheadFull));

    provider.release.notify_one();
    assert_eq!(busy.await.unwrap().unwrap(), "first");
}
