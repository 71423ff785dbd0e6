//! Configuration input for the gatherer.

mod device_config;

pub use device_config::{ConfigError, DeviceConfig};
