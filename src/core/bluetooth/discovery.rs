//! Discovery stage: repeated bounded scans with backoff between attempts.

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::backoff::RetryPolicy;
use crate::core::bluetooth::transport::GattTransport;
use crate::progress::ProgressReporter;

/// Terminal outcome of the discovery stage.
#[derive(Debug)]
pub enum Discovery<D> {
    Found(D),
    NotFound { attempts: usize },
    Interrupted,
}

/// Scans until the target device is found or the attempt budget is spent.
///
/// Exactly `policy.max_attempts` scans are made in the worst case. A scan
/// timeout counts as "not found", and so does a transport-level scan error;
/// both leave the retry budget in charge. The retry delay is skipped after
/// a terminal outcome.
pub async fn discover_device<T: GattTransport>(
    transport: &T,
    address: &str,
    policy: &RetryPolicy,
    token: &CancellationToken,
    reporter: &ProgressReporter,
) -> Discovery<T::Device> {
    for attempt in 0..policy.max_attempts {
        reporter.scan_attempt(address, attempt, policy.max_attempts);
        let indicator = reporter.begin_scan(policy.scan_timeout, token);

        let scan = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = transport.scan_for_address(address, policy.scan_timeout) => Some(result),
        };
        if let Some(indicator) = indicator {
            indicator.finish().await;
        }

        let Some(result) = scan else {
            return Discovery::Interrupted;
        };

        match result {
            Ok(Some(device)) => {
                info!("Device {} found on attempt {}", address, attempt + 1);
                return Discovery::Found(device);
            }
            Ok(None) => {}
            Err(e) => warn!("Scan attempt {} failed: {}", attempt + 1, e),
        }

        reporter.scan_missed(attempt, policy.max_attempts);
        if policy.should_retry(attempt) && policy.wait_before_retry(token).await.is_err() {
            return Discovery::Interrupted;
        }
    }

    Discovery::NotFound {
        attempts: policy.max_attempts,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::core::bluetooth::testing::FakeTransport;
    use crate::core::bluetooth::transport::TransportError;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(20),
            Duration::from_secs(10),
        )
    }

    fn quiet() -> ProgressReporter {
        ProgressReporter::new(false)
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_the_attempt_budget_with_waits_between() {
        let transport = FakeTransport::new().scans(vec![Ok(false), Ok(false), Ok(false)]);
        let token = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let outcome =
            discover_device(&transport, "AA:BB:CC:DD:EE:FF", &policy(), &token, &quiet()).await;

        assert!(matches!(outcome, Discovery::NotFound { attempts: 3 }));
        assert_eq!(transport.scan_calls.load(Ordering::SeqCst), 3);
        // Two backoff waits of 2 s each; no wait after the final attempt.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_scanning_once_found() {
        let transport = FakeTransport::new().scans(vec![Ok(false), Ok(true)]);
        let token = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let outcome =
            discover_device(&transport, "AA:BB:CC:DD:EE:FF", &policy(), &token, &quiet()).await;

        assert!(matches!(outcome, Discovery::Found(_)));
        assert_eq!(transport.scan_calls.load(Ordering::SeqCst), 2);
        // Found on the second attempt: exactly one backoff wait.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn scan_errors_consume_an_attempt_like_a_miss() {
        let transport = FakeTransport::new().scans(vec![
            Err(TransportError::Adapter("scan failed".into())),
            Ok(true),
        ]);
        let token = CancellationToken::new();

        let outcome =
            discover_device(&transport, "AA:BB:CC:DD:EE:FF", &policy(), &token, &quiet()).await;

        assert!(matches!(outcome, Discovery::Found(_)));
        assert_eq!(transport.scan_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_interrupts_the_stage() {
        let transport = FakeTransport::new().scans(vec![Ok(false), Ok(false), Ok(false)]);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let outcome =
            discover_device(&transport, "AA:BB:CC:DD:EE:FF", &policy(), &token, &quiet()).await;

        assert!(matches!(outcome, Discovery::Interrupted));
        // The cancel landed in the first backoff wait, after one scan.
        assert_eq!(transport.scan_calls.load(Ordering::SeqCst), 1);
    }
}
