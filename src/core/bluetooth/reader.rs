//! Paced read stage: sequential characteristic reads with a fixed spacing
//! floor between them.

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::config::DeviceConfig;
use crate::core::bluetooth::backoff::{RetryPolicy, cancellable_sleep};
use crate::core::bluetooth::selection::uuid_matches;
use crate::core::bluetooth::transport::{GattTransport, TransportError};
use crate::core::bluetooth::types::{ReadOutcome, ServiceInfo};

/// Result of the read batch: all reads attempted, or cut short by
/// cancellation with the outcomes gathered so far.
#[derive(Debug, Default)]
pub struct ReadBatch {
    pub reads: Vec<ReadOutcome>,
    pub onboard_storage: Option<Vec<u8>>,
    pub interrupted: bool,
}

/// Reads every selected characteristic, strictly in selection order, one
/// at a time.
///
/// The inter-read delay runs before each read, the first included, so the
/// peripheral sees a guaranteed minimum spacing regardless of how long the
/// preceding stages took. A read that times out or fails records its
/// outcome and the batch moves on; the remaining reads still happen.
pub async fn read_selected<T: GattTransport>(
    transport: &T,
    connection: &T::Connection,
    services: &[ServiceInfo],
    config: &DeviceConfig,
    policy: &RetryPolicy,
    token: &CancellationToken,
) -> ReadBatch {
    let mut batch = ReadBatch::default();

    for service in services {
        for characteristic in service.readable_characteristics() {
            if cancellable_sleep(policy.inter_read_delay, token)
                .await
                .is_err()
            {
                batch.interrupted = true;
                return batch;
            }

            let uuid = characteristic.uuid;
            debug!("Reading characteristic {}", uuid);
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    batch.interrupted = true;
                    return batch;
                }
                result = transport.read_characteristic(connection, uuid) => match result {
                    Ok(value) => ReadOutcome::Success { uuid, value },
                    Err(TransportError::Timeout) => ReadOutcome::TimedOut { uuid },
                    Err(e) => ReadOutcome::Failed { uuid, reason: e.to_string() },
                },
            };

            // The configured target characteristic doubles as the onboard
            // storage result; it is tagged, not read a second time.
            if let ReadOutcome::Success { value, .. } = &outcome {
                if uuid_matches(uuid, &config.characteristic_uuid) {
                    batch.onboard_storage = Some(value.clone());
                }
            }
            batch.reads.push(outcome);
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::core::bluetooth::testing::{
        FakeTransport, readable_char, service, test_config,
    };

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(20),
            Duration::from_secs(10),
        )
    }

    fn two_char_service(a: Uuid, b: Uuid) -> Vec<ServiceInfo> {
        vec![service(
            Uuid::from_u128(1),
            "Xpress Streaming Service (BGX)",
            vec![readable_char(a), readable_char(b)],
        )]
    }

    #[tokio::test(start_paused = true)]
    async fn delay_precedes_every_read_including_the_first() {
        let a = Uuid::from_u128(0xa);
        let b = Uuid::from_u128(0xb);
        let transport = FakeTransport::new()
            .read(a, Ok(vec![1]))
            .read(b, Ok(vec![2]));
        let token = CancellationToken::new();
        let config = test_config();

        let started = tokio::time::Instant::now();
        let batch = read_selected(
            &transport,
            &(),
            &two_char_service(a, b),
            &config,
            &policy(),
            &token,
        )
        .await;

        assert!(!batch.interrupted);
        assert_eq!(batch.reads.len(), 2);
        // Two reads, each preceded by the 1 s pacing delay.
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn one_failed_read_does_not_abort_the_batch() {
        let a = Uuid::from_u128(0xa);
        let b = Uuid::from_u128(0xb);
        let c = Uuid::from_u128(0xc);
        let transport = FakeTransport::new()
            .read(a, Ok(vec![1]))
            .read(b, Err(TransportError::Other("gatt failure".into())))
            .read(c, Ok(vec![3]));
        let token = CancellationToken::new();
        let config = test_config();
        let services = vec![service(
            Uuid::from_u128(1),
            "Xpress Streaming Service (BGX)",
            vec![readable_char(a), readable_char(b), readable_char(c)],
        )];

        let batch = read_selected(&transport, &(), &services, &config, &policy(), &token).await;

        let uuids: Vec<Uuid> = batch.reads.iter().map(|o| o.uuid()).collect();
        assert_eq!(uuids, vec![a, b, c]);
        assert!(batch.reads[0].is_success());
        assert!(matches!(batch.reads[1], ReadOutcome::Failed { .. }));
        assert!(batch.reads[2].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_and_errors_stay_distinct() {
        let a = Uuid::from_u128(0xa);
        let b = Uuid::from_u128(0xb);
        let transport = FakeTransport::new()
            .read(a, Err(TransportError::Timeout))
            .read(b, Err(TransportError::Other("disconnected".into())));
        let token = CancellationToken::new();
        let config = test_config();

        let batch = read_selected(
            &transport,
            &(),
            &two_char_service(a, b),
            &config,
            &policy(),
            &token,
        )
        .await;

        assert!(matches!(batch.reads[0], ReadOutcome::TimedOut { .. }));
        assert!(matches!(batch.reads[1], ReadOutcome::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn target_characteristic_is_tagged_as_onboard_storage() {
        let config = test_config();
        let target: Uuid = config.characteristic_uuid.parse().unwrap();
        let other = Uuid::from_u128(0xb);
        let transport = FakeTransport::new()
            .read(other, Ok(vec![1, 2]))
            .read(target, Ok(vec![0xde, 0xad]));
        let token = CancellationToken::new();

        let batch = read_selected(
            &transport,
            &(),
            &two_char_service(other, target),
            &config,
            &policy(),
            &token,
        )
        .await;

        assert_eq!(batch.reads.len(), 2);
        assert_eq!(batch.onboard_storage, Some(vec![0xde, 0xad]));
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_during_the_second_delay_keeps_the_first_outcome() {
        let a = Uuid::from_u128(0xa);
        let b = Uuid::from_u128(0xb);
        let transport = FakeTransport::new()
            .read(a, Ok(vec![1]))
            .read(b, Ok(vec![2]));
        let token = CancellationToken::new();
        let config = test_config();

        // First delay spans 0..1 s, second 1..2 s; cancel lands inside the
        // second one.
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            canceller.cancel();
        });

        let batch = read_selected(
            &transport,
            &(),
            &two_char_service(a, b),
            &config,
            &policy(),
            &token,
        )
        .await;

        assert!(batch.interrupted);
        assert_eq!(batch.reads.len(), 1);
        assert_eq!(batch.reads[0].uuid(), a);
    }
}
