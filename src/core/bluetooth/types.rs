//! Defines shared data structures for the Bluetooth module.

use serde::Serialize;
use uuid::Uuid;

/// Capability flags reported for a characteristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CharacteristicProps {
    /// Whether the characteristic value can be read
    pub readable: bool,
    /// Whether the characteristic value can be written
    pub writable: bool,
    /// Whether the characteristic supports value notifications
    pub notifiable: bool,
}

impl CharacteristicProps {
    /// Short capability tags for display, e.g. `R,W,N`.
    pub fn tags(&self) -> String {
        let mut tags = Vec::new();
        if self.readable {
            tags.push("R");
        }
        if self.writable {
            tags.push("W");
        }
        if self.notifiable {
            tags.push("N");
        }
        tags.join(",")
    }
}

/// A characteristic as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub properties: CharacteristicProps,
}

/// A GATT service and its characteristics, in device-reported order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    /// Human-readable service name, where one is known.
    pub description: String,
    pub characteristics: Vec<CharacteristicInfo>,
}

impl ServiceInfo {
    /// The service's readable characteristics, in device-reported order.
    pub fn readable_characteristics(&self) -> impl Iterator<Item = &CharacteristicInfo> {
        self.characteristics
            .iter()
            .filter(|c| c.properties.readable)
    }
}

/// Result of one attempted characteristic read. One failed read never
/// aborts the rest of the batch; every attempt produces exactly one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReadOutcome {
    Success { uuid: Uuid, value: Vec<u8> },
    TimedOut { uuid: Uuid },
    Failed { uuid: Uuid, reason: String },
}

impl ReadOutcome {
    /// UUID of the characteristic this outcome belongs to.
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Success { uuid, .. } | Self::TimedOut { uuid } | Self::Failed { uuid, .. } => {
                *uuid
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Everything gathered over one run: the selected services, the outcome of
/// each attempted read, and the value of the designated onboard storage
/// characteristic when it was read successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GatherReport {
    pub services: Vec<ServiceInfo>,
    pub reads: Vec<ReadOutcome>,
    pub onboard_storage: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_tags_render_in_fixed_order() {
        let props = CharacteristicProps {
            readable: true,
            writable: false,
            notifiable: true,
        };
        assert_eq!(props.tags(), "R,N");
        assert_eq!(CharacteristicProps::default().tags(), "");
    }

    #[test]
    fn readable_characteristics_keeps_order() {
        let readable = |uuid| CharacteristicInfo {
            uuid,
            properties: CharacteristicProps {
                readable: true,
                ..Default::default()
            },
        };
        let notify_only = CharacteristicInfo {
            uuid: Uuid::from_u128(2),
            properties: CharacteristicProps {
                notifiable: true,
                ..Default::default()
            },
        };
        let service = ServiceInfo {
            uuid: Uuid::from_u128(0xaa),
            description: "Test".into(),
            characteristics: vec![readable(Uuid::from_u128(1)), notify_only, readable(Uuid::from_u128(3))],
        };

        let uuids: Vec<Uuid> = service.readable_characteristics().map(|c| c.uuid).collect();
        assert_eq!(uuids, vec![Uuid::from_u128(1), Uuid::from_u128(3)]);
    }
}
