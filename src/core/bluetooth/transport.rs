//! The GATT transport seam the gathering stages are built on.
//!
//! Stages drive a [`GattTransport`] rather than the BLE stack directly;
//! tests exercise the protocol flow against a scripted transport.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::bluetooth::types::ServiceInfo;

/// Failure modes of the transport primitives.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("operation timed out")]
    Timeout,
    #[error("bluetooth adapter error: {0}")]
    Adapter(String),
    #[error("{0}")]
    Other(String),
}

/// Primitive BLE operations. Implemented for the system adapter by
/// [`BluestTransport`](crate::core::bluetooth::BluestTransport).
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Opaque handle for a device seen during scanning. Only valid within
    /// the process that produced it.
    type Device: Send + Sync;
    /// Opaque handle for an open connection.
    type Connection: Send + Sync;

    /// Scans for a device with the given link-layer address. Not finding
    /// the device within `timeout` is `Ok(None)`, not an error.
    async fn scan_for_address(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Option<Self::Device>, TransportError>;

    /// Opens a connection to a previously discovered device.
    async fn connect(
        &self,
        device: &Self::Device,
        timeout: Duration,
    ) -> Result<Self::Connection, TransportError>;

    /// Enumerates the connection's services in device-reported order.
    async fn list_services(
        &self,
        connection: &Self::Connection,
    ) -> Result<Vec<ServiceInfo>, TransportError>;

    /// Reads the value of a single characteristic.
    async fn read_characteristic(
        &self,
        connection: &Self::Connection,
        uuid: Uuid,
    ) -> Result<Vec<u8>, TransportError>;

    /// Closes the connection. Idempotent and best-effort; failures are
    /// logged by the implementation rather than surfaced.
    async fn disconnect(&self, connection: &Self::Connection);
}
