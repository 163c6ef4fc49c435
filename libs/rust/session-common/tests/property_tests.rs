//! Property-based tests for session-common.
//!
//! These tests verify universal properties across all inputs using proptest.

use proptest::prelude::*;
use session_common::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, LedgerBackend, LedgerClient,
    LedgerClientConfig, PlatformError,
};
use std::sync::Arc;
use std::time::Duration;

// Property: non-transient errors are never classified as retryable.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retryable_errors_are_consistent(msg in "[a-zA-Z0-9 ]{1,50}") {
        for err in [PlatformError::unavailable(&msg), PlatformError::timeout(&msg)] {
            prop_assert!(err.is_retryable(), "Error {:?} should be retryable", err);
        }

        for err in [
            PlatformError::circuit_open(&msg),
            PlatformError::invalid_input(&msg),
            PlatformError::Internal(msg.clone()),
        ] {
            prop_assert!(!err.is_retryable(), "Error {:?} should not be retryable", err);
        }
    }
}

// Property: after N consecutive failures (N = threshold) the circuit is Open
// and rejects requests until the cooldown elapses.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_circuit_breaker_opens_after_threshold(failure_threshold in 1u32..10) {
        tokio_test::block_on(async {
            let config = CircuitBreakerConfig::default()
                .with_failure_threshold(failure_threshold)
                .with_timeout(Duration::from_secs(60));
            let cb = CircuitBreaker::new("prop", config);

            for _ in 1..failure_threshold {
                cb.record_failure().await;
            }
            prop_assert_eq!(cb.state().await, CircuitState::Closed);

            cb.record_failure().await;
            prop_assert_eq!(cb.state().await, CircuitState::Open);
            prop_assert!(!cb.allow_request().await);

            Ok(())
        })?;
    }

    #[test]
    fn prop_half_open_admits_exactly_one(
        failure_threshold in 1u32..5,
        callers in 2usize..16,
    ) {
        tokio_test::block_on(async {
            let config = CircuitBreakerConfig::default()
                .with_failure_threshold(failure_threshold)
                .with_timeout(Duration::from_millis(1));
            let cb = CircuitBreaker::new("prop", config);

            for _ in 0..failure_threshold {
                cb.record_failure().await;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;

            let mut admitted = 0;
            for _ in 0..callers {
                if cb.allow_request().await {
                    admitted += 1;
                }
            }

            prop_assert_eq!(admitted, 1);
            prop_assert_eq!(cb.state().await, CircuitState::HalfOpen);

            Ok(())
        })?;
    }
}

// Property: keys with the same name in different namespaces never collide,
// even over a shared backend.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_ledger_namespace_isolation(
        ns1 in "[a-z]{3,10}",
        ns2 in "[a-z]{3,10}",
        key in "[a-z0-9]{5,20}",
        value1 in proptest::collection::vec(any::<u8>(), 1..100),
        value2 in proptest::collection::vec(any::<u8>(), 1..100),
    ) {
        prop_assume!(ns1 != ns2);

        tokio_test::block_on(async {
            let backend: Arc<dyn LedgerBackend> = Arc::new(session_common::InMemoryBackend::default());
            let client1 = LedgerClient::new(LedgerClientConfig::default().with_namespace(&ns1), backend.clone());
            let client2 = LedgerClient::new(LedgerClientConfig::default().with_namespace(&ns2), backend);
            let ttl = Duration::from_secs(60);

            client1.put(&key, &value1, ttl).await.unwrap();
            client2.put(&key, &value2, ttl).await.unwrap();

            prop_assert_eq!(client1.get(&key).await.unwrap(), Some(value1.clone()));
            prop_assert_eq!(client2.get(&key).await.unwrap(), Some(value2.clone()));

            Ok(())
        })?;
    }

    #[test]
    fn prop_put_if_absent_first_writer_wins(
        key in "[a-z0-9]{5,20}",
        first in proptest::collection::vec(any::<u8>(), 1..64),
        second in proptest::collection::vec(any::<u8>(), 1..64),
    ) {
        tokio_test::block_on(async {
            let client = LedgerClient::in_memory(LedgerClientConfig::default());
            let ttl = Duration::from_secs(60);

            prop_assert!(client.put_if_absent(&key, &first, ttl).await.unwrap());
            prop_assert!(!client.put_if_absent(&key, &second, ttl).await.unwrap());
            prop_assert_eq!(client.get(&key).await.unwrap(), Some(first.clone()));

            Ok(())
        })?;
    }
}

// Property: after its TTL lapses an entry is neither readable nor reported
// as existing.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(25))]

    #[test]
    fn prop_ledger_ttl_enforcement(
        key in "[a-z0-9]{5,20}",
        value in proptest::collection::vec(any::<u8>(), 1..100),
    ) {
        tokio_test::block_on(async {
            let client = LedgerClient::in_memory(LedgerClientConfig::default());

            client.put(&key, &value, Duration::from_millis(1)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;

            prop_assert_eq!(client.get(&key).await.unwrap(), None);
            prop_assert!(!client.exists(&key).await.unwrap());

            Ok(())
        })?;
    }
}
