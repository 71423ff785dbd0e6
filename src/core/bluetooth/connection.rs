//! Connection stage: a single timed connection attempt.

use log::info;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::backoff::RetryPolicy;
use crate::core::bluetooth::transport::{GattTransport, TransportError};

/// Outcome of the connection attempt.
#[derive(Debug)]
pub enum Connect<C> {
    Open(C),
    Failed(TransportError),
    Interrupted,
}

/// Attempts exactly one connection to the discovered device.
///
/// Discovery already spent the retry budget; a failure here is surfaced
/// rather than retried, so the peripheral's BLE stack is not hit with a
/// second wave of connection requests.
pub async fn establish<T: GattTransport>(
    transport: &T,
    device: &T::Device,
    policy: &RetryPolicy,
    token: &CancellationToken,
) -> Connect<T::Connection> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Connect::Interrupted,
        result = transport.connect(device, policy.connection_timeout) => match result {
            Ok(connection) => {
                info!("Connected to device");
                Connect::Open(connection)
            }
            Err(e) => Connect::Failed(e),
        },
    }
}
