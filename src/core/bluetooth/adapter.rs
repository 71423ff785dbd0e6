//! [`GattTransport`] implementation over the `bluest` BLE stack.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, info, warn};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::core::bluetooth::constants::{GATT_OPERATION_TIMEOUT_SECS, KNOWN_SERVICES};
use crate::core::bluetooth::transport::{GattTransport, TransportError};
use crate::core::bluetooth::types::{CharacteristicInfo, CharacteristicProps, ServiceInfo};

/// An open link plus the characteristic handles discovered over it. The
/// handle cache is filled during service enumeration so reads do not walk
/// the GATT tree again.
pub struct OpenConnection {
    device: Device,
    characteristics: Mutex<HashMap<Uuid, bluest::Characteristic>>,
}

/// Production transport backed by the system Bluetooth adapter.
pub struct BluestTransport {
    adapter: Adapter,
}

impl BluestTransport {
    /// Acquires the default system adapter and waits for it to power up.
    pub async fn new() -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");
        Ok(Self { adapter })
    }

    /// Drains the advertisement stream until a device with the target
    /// address shows up. Bounded by the caller's timeout.
    async fn find_in_scan(&self, address: &str) -> Result<Option<Device>, TransportError> {
        // A device the adapter already holds a link to may not advertise;
        // check the connected set first.
        let connected = self
            .adapter
            .connected_devices()
            .await
            .map_err(adapter_err)?;
        for device in connected {
            if device_matches(&device, address) {
                debug!("Target device already known to the adapter");
                return Ok(Some(device));
            }
        }

        let mut scan = self.adapter.scan(&[]).await.map_err(adapter_err)?;
        while let Some(discovered) = scan.next().await {
            let device = discovered.device;
            debug!(
                "Advertisement from {} (rssi {:?})",
                device.id(),
                discovered.rssi
            );
            if device_matches(&device, address) {
                return Ok(Some(device));
            }
        }
        Ok(None)
    }
}

fn adapter_err(e: bluest::Error) -> TransportError {
    TransportError::Adapter(e.to_string())
}

fn gatt_err(e: bluest::Error) -> TransportError {
    TransportError::Other(e.to_string())
}

/// Matches a device against the configured link-layer address, either via
/// the MAC embedded in the platform device id or the whole id (macOS ids
/// are opaque UUIDs rather than addresses).
fn device_matches(device: &Device, address: &str) -> bool {
    let id = device.id().to_string();
    if id.eq_ignore_ascii_case(address) {
        return true;
    }
    extract_mac_address(&id).is_some_and(|mac| mac.eq_ignore_ascii_case(address))
}

fn extract_mac_address(device_id: &str) -> Option<String> {
    let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").ok()?;
    re.find_iter(device_id)
        .last()
        .map(|m| m.as_str().to_uppercase())
}

/// Human-readable name for a service, where one is known.
fn service_description(uuid: Uuid) -> String {
    KNOWN_SERVICES
        .iter()
        .find(|(known, _)| *known == uuid)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| "Unknown Service".to_string())
}

#[async_trait]
impl GattTransport for BluestTransport {
    type Device = Device;
    type Connection = OpenConnection;

    async fn scan_for_address(
        &self,
        address: &str,
        limit: Duration,
    ) -> Result<Option<Device>, TransportError> {
        match timeout(limit, self.find_in_scan(address)).await {
            Ok(result) => result,
            // Running out of scan time is "not found", not an error.
            Err(_) => Ok(None),
        }
    }

    async fn connect(
        &self,
        device: &Device,
        limit: Duration,
    ) -> Result<OpenConnection, TransportError> {
        match timeout(limit, self.adapter.connect_device(device)).await {
            Ok(Ok(())) => Ok(OpenConnection {
                device: device.clone(),
                characteristics: Mutex::new(HashMap::new()),
            }),
            Ok(Err(e)) => Err(gatt_err(e)),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn list_services(
        &self,
        connection: &OpenConnection,
    ) -> Result<Vec<ServiceInfo>, TransportError> {
        let services = connection.device.services().await.map_err(gatt_err)?;
        let mut infos = Vec::with_capacity(services.len());
        let mut handles = connection.characteristics.lock().await;

        for service in services {
            let uuid = service.uuid();
            let characteristics = service.characteristics().await.map_err(gatt_err)?;
            let mut chars = Vec::with_capacity(characteristics.len());
            for characteristic in characteristics {
                let char_uuid = characteristic.uuid();
                let props = characteristic.properties().await.map_err(gatt_err)?;
                chars.push(CharacteristicInfo {
                    uuid: char_uuid,
                    properties: CharacteristicProps {
                        readable: props.read,
                        writable: props.write || props.write_without_response,
                        notifiable: props.notify,
                    },
                });
                handles.insert(char_uuid, characteristic);
            }
            infos.push(ServiceInfo {
                uuid,
                description: service_description(uuid),
                characteristics: chars,
            });
        }
        Ok(infos)
    }

    async fn read_characteristic(
        &self,
        connection: &OpenConnection,
        uuid: Uuid,
    ) -> Result<Vec<u8>, TransportError> {
        let handle = {
            let handles = connection.characteristics.lock().await;
            handles.get(&uuid).cloned()
        };
        let Some(handle) = handle else {
            return Err(TransportError::Other(format!(
                "characteristic {uuid} has not been discovered"
            )));
        };

        match timeout(
            Duration::from_secs(GATT_OPERATION_TIMEOUT_SECS),
            handle.read(),
        )
        .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(gatt_err(e)),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn disconnect(&self, connection: &OpenConnection) {
        if connection.device.is_connected().await {
            info!("Disconnecting from device {}", connection.device.id());
            if let Err(e) = self.adapter.disconnect_device(&connection.device).await {
                warn!("Failed to disconnect cleanly: {}", e);
            }
        } else {
            debug!("Device {} not connected", connection.device.id());
        }
    }
}
