//! Scripted transport used by the stage tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::DeviceConfig;
use crate::core::bluetooth::transport::{GattTransport, TransportError};
use crate::core::bluetooth::types::{CharacteristicInfo, CharacteristicProps, ServiceInfo};

/// Transport whose every primitive is scripted in advance. Scan results
/// are consumed one per attempt; reads are looked up by UUID.
pub(crate) struct FakeTransport {
    scan_script: Mutex<VecDeque<Result<bool, TransportError>>>,
    connect_error: Mutex<Option<TransportError>>,
    service_script: Vec<ServiceInfo>,
    read_script: Mutex<HashMap<Uuid, Result<Vec<u8>, TransportError>>>,
    pub scan_calls: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub disconnected: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            scan_script: Mutex::new(VecDeque::new()),
            connect_error: Mutex::new(None),
            service_script: Vec::new(),
            read_script: Mutex::new(HashMap::new()),
            scan_calls: AtomicUsize::new(0),
            connect_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            disconnected: AtomicBool::new(false),
        }
    }

    /// One entry per expected scan attempt; `Ok(true)` finds the device.
    pub fn scans(self, results: Vec<Result<bool, TransportError>>) -> Self {
        *self.scan_script.lock().unwrap() = results.into();
        self
    }

    pub fn failing_connect(self, error: TransportError) -> Self {
        *self.connect_error.lock().unwrap() = Some(error);
        self
    }

    pub fn services(mut self, services: Vec<ServiceInfo>) -> Self {
        self.service_script = services;
        self
    }

    pub fn read(self, uuid: Uuid, result: Result<Vec<u8>, TransportError>) -> Self {
        self.read_script.lock().unwrap().insert(uuid, result);
        self
    }
}

#[async_trait]
impl GattTransport for FakeTransport {
    type Device = ();
    type Connection = ();

    async fn scan_for_address(
        &self,
        _address: &str,
        _timeout: Duration,
    ) -> Result<Option<()>, TransportError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        match self.scan_script.lock().unwrap().pop_front() {
            Some(Ok(true)) => Ok(Some(())),
            Some(Ok(false)) | None => Ok(None),
            Some(Err(e)) => Err(e),
        }
    }

    async fn connect(&self, _device: &(), _timeout: Duration) -> Result<(), TransportError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        match self.connect_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn list_services(&self, _connection: &()) -> Result<Vec<ServiceInfo>, TransportError> {
        Ok(self.service_script.clone())
    }

    async fn read_characteristic(
        &self,
        _connection: &(),
        uuid: Uuid,
    ) -> Result<Vec<u8>, TransportError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.read_script
            .lock()
            .unwrap()
            .get(&uuid)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Other(format!("unscripted read of {uuid}"))))
    }

    async fn disconnect(&self, _connection: &()) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// A characteristic that only supports reads.
pub(crate) fn readable_char(uuid: Uuid) -> CharacteristicInfo {
    CharacteristicInfo {
        uuid,
        properties: CharacteristicProps {
            readable: true,
            ..Default::default()
        },
    }
}

/// A characteristic the selection stage must skip.
pub(crate) fn write_only_char(uuid: Uuid) -> CharacteristicInfo {
    CharacteristicInfo {
        uuid,
        properties: CharacteristicProps {
            writable: true,
            ..Default::default()
        },
    }
}

pub(crate) fn service(uuid: Uuid, description: &str, characteristics: Vec<CharacteristicInfo>) -> ServiceInfo {
    ServiceInfo {
        uuid,
        description: description.to_string(),
        characteristics,
    }
}

pub(crate) fn test_config() -> DeviceConfig {
    DeviceConfig {
        device_address: "AA:BB:CC:DD:EE:FF".to_string(),
        service_uuid: "331a36f5-2459-45ea-9d95-6142f0c4b307".to_string(),
        characteristic_uuid: "a9da6040-0823-4995-94ec-9ce41ca28833".to_string(),
    }
}
