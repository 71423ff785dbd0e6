//! Device target configuration loaded from a plain-text file.
//!
//! The file carries one `key=value` pair per line, three lines in fixed
//! order: `device_address`, `service_uuid`, `characteristic_uuid`. Values
//! may be wrapped in double quotes, which are stripped.

use std::io;
use std::path::Path;

use log::info;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Why the configuration file could not be turned into a [`DeviceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file '{path}' not found")]
    NotFound { path: String },
    #[error("failed to read configuration file: {0}")]
    Io(#[from] io::Error),
    #[error("line {line} is not in the format key=value")]
    MalformedLine { line: usize },
    #[error("configuration file is missing required fields")]
    MissingFields,
    #[error("device address, service UUID, or characteristic UUID is missing or improperly formatted")]
    EmptyValue,
    #[error("{key} is not a valid UUID")]
    InvalidUuid { key: &'static str },
}

/// The target device profile for one gathering run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Link-layer address of the device, e.g. `AA:BB:CC:DD:EE:FF`.
    pub device_address: String,
    /// Textual 128-bit UUID of the service to gather from.
    pub service_uuid: String,
    /// Textual 128-bit UUID of the onboard storage characteristic.
    pub characteristic_uuid: String,
}

impl DeviceConfig {
    /// Reads and parses the configuration file at `path`.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let config = Self::parse(&raw)?;
        info!("Device configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parses configuration text. Blank lines are skipped; everything else
    /// must be `key=value` with exactly one `=`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        for (idx, line) in lines.iter().enumerate() {
            if line.split('=').count() != 2 {
                return Err(ConfigError::MalformedLine { line: idx + 1 });
            }
        }
        if lines.len() < 3 {
            return Err(ConfigError::MissingFields);
        }

        let device_address = value_of(lines[0]);
        let service_uuid = value_of(lines[1]);
        let characteristic_uuid = value_of(lines[2]);
        if device_address.is_empty() || service_uuid.is_empty() || characteristic_uuid.is_empty() {
            return Err(ConfigError::EmptyValue);
        }

        if Uuid::parse_str(&service_uuid).is_err() {
            return Err(ConfigError::InvalidUuid { key: "service_uuid" });
        }
        if Uuid::parse_str(&characteristic_uuid).is_err() {
            return Err(ConfigError::InvalidUuid {
                key: "characteristic_uuid",
            });
        }

        Ok(Self {
            device_address,
            service_uuid,
            characteristic_uuid,
        })
    }
}

fn value_of(line: &str) -> String {
    match line.split_once('=') {
        Some((_, value)) => value.trim().trim_matches('"').to_string(),
        None => String::new(),
    }
}
