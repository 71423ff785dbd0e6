//! Constants used throughout the application.
//! This module contains the fixed policy values of the gathering protocol
//! and the UUIDs of services the tool knows how to describe.

use std::time::Duration;
use uuid::Uuid;

/// Number of discovery attempts before the run gives up.
pub const MAX_SCAN_ATTEMPTS: usize = 3;

/// Minimum spacing enforced before every characteristic read.
pub const INTER_READ_DELAY: Duration = Duration::from_secs(1);

/// Case-insensitive markers identifying the BGX device family in service
/// descriptions.
pub const SERVICE_FAMILY_MARKERS: [&str; 2] = ["bgx", "xpress"];

/// Timeout for a single GATT read operation in seconds.
pub const GATT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Default timeout for the BLE connection in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: f64 = 10.0;

/// Default delay between discovery retries in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 2.0;

/// Default timeout for BLE scanning in seconds.
pub const DEFAULT_SCAN_TIMEOUT_SECS: f64 = 20.0;

/// Standard Bluetooth Service UUIDs
pub const UUID_GENERIC_ACCESS_SERVICE: Uuid =
    Uuid::from_u128(0x00001800_0000_1000_8000_00805f9b34fb);
pub const UUID_GENERIC_ATTRIBUTE_SERVICE: Uuid =
    Uuid::from_u128(0x00001801_0000_1000_8000_00805f9b34fb);
pub const UUID_DEVICE_INFORMATION_SERVICE: Uuid =
    Uuid::from_u128(0x0000180a_0000_1000_8000_00805f9b34fb);
pub const UUID_BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);

/// The UUID of the Silicon Labs Xpress streaming service exposed by BGX
/// modules.
pub const UUID_XPRESS_STREAMING_SERVICE: Uuid =
    Uuid::from_u128(0x331a36f5_2459_45ea_9d95_6142f0c4b307);

/// Descriptions for the services this tool can name. GATT itself only
/// reports UUIDs; free-text descriptions exist for well-known services.
pub const KNOWN_SERVICES: [(Uuid, &str); 5] = [
    (UUID_GENERIC_ACCESS_SERVICE, "Generic Access"),
    (UUID_GENERIC_ATTRIBUTE_SERVICE, "Generic Attribute"),
    (UUID_DEVICE_INFORMATION_SERVICE, "Device Information"),
    (UUID_BATTERY_SERVICE, "Battery Service"),
    (UUID_XPRESS_STREAMING_SERVICE, "Xpress Streaming Service (BGX)"),
];
