//! Enumeration filtering: which services and characteristics get read.

use uuid::Uuid;

use crate::config::DeviceConfig;
use crate::core::bluetooth::constants::SERVICE_FAMILY_MARKERS;
use crate::core::bluetooth::types::ServiceInfo;

/// True when a service belongs to the target device family.
///
/// A service is relevant when its description carries one of the family
/// markers (case-insensitive), or when its UUID is the one named in the
/// configuration. Everything else is silently excluded; exclusion is
/// filtering policy, not an error.
pub fn is_relevant_service(service: &ServiceInfo, config: &DeviceConfig, markers: &[&str]) -> bool {
    let description = service.description.to_lowercase();
    if markers.iter().any(|marker| description.contains(marker)) {
        return true;
    }
    uuid_matches(service.uuid, &config.service_uuid)
}

/// Compares a UUID against its configured textual form, ignoring case.
pub(crate) fn uuid_matches(uuid: Uuid, configured: &str) -> bool {
    uuid.to_string().eq_ignore_ascii_case(configured.trim())
}

/// Filters the enumerated services down to the relevant ones and drops
/// characteristics that are not readable. Device-reported order is kept,
/// and the result is the same however often the filter runs.
pub fn select_services(services: &[ServiceInfo], config: &DeviceConfig) -> Vec<ServiceInfo> {
    services
        .iter()
        .filter(|service| is_relevant_service(service, config, &SERVICE_FAMILY_MARKERS))
        .map(|service| ServiceInfo {
            uuid: service.uuid,
            description: service.description.clone(),
            characteristics: service
                .characteristics
                .iter()
                .filter(|c| c.properties.readable)
                .cloned()
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::testing::{readable_char, service, test_config, write_only_char};

    #[test]
    fn marker_match_ignores_case() {
        let config = test_config();
        let xpress = service(Uuid::from_u128(1), "XPRESS Streaming Service", vec![]);
        let bgx = service(Uuid::from_u128(2), "Bgx Vendor Block", vec![]);
        let battery = service(Uuid::from_u128(3), "Battery Service", vec![]);

        assert!(is_relevant_service(&xpress, &config, &SERVICE_FAMILY_MARKERS));
        assert!(is_relevant_service(&bgx, &config, &SERVICE_FAMILY_MARKERS));
        assert!(!is_relevant_service(&battery, &config, &SERVICE_FAMILY_MARKERS));
    }

    #[test]
    fn configured_uuid_matches_even_without_description() {
        let config = test_config();
        let unknown = service(
            config.service_uuid.parse().unwrap(),
            "Unknown Service",
            vec![],
        );
        assert!(is_relevant_service(&unknown, &config, &SERVICE_FAMILY_MARKERS));
    }

    #[test]
    fn uuid_comparison_ignores_case() {
        let uuid = Uuid::from_u128(0x331a36f5_2459_45ea_9d95_6142f0c4b307);
        assert!(uuid_matches(uuid, "331A36F5-2459-45EA-9D95-6142F0C4B307"));
        assert!(!uuid_matches(uuid, "00001800-0000-1000-8000-00805f9b34fb"));
    }

    #[test]
    fn keeps_only_readable_characteristics_in_order() {
        let config = test_config();
        let services = vec![service(
            Uuid::from_u128(1),
            "Xpress Streaming Service (BGX)",
            vec![
                readable_char(Uuid::from_u128(0x10)),
                write_only_char(Uuid::from_u128(0x20)),
                readable_char(Uuid::from_u128(0x30)),
            ],
        )];

        let selected = select_services(&services, &config);
        assert_eq!(selected.len(), 1);
        let uuids: Vec<Uuid> = selected[0].characteristics.iter().map(|c| c.uuid).collect();
        assert_eq!(uuids, vec![Uuid::from_u128(0x10), Uuid::from_u128(0x30)]);
    }

    #[test]
    fn irrelevant_services_are_dropped_not_failed() {
        let config = test_config();
        let services = vec![
            service(Uuid::from_u128(1), "Generic Access", vec![]),
            service(Uuid::from_u128(2), "Device Information", vec![]),
        ];
        assert!(select_services(&services, &config).is_empty());
    }

    #[test]
    fn selection_is_idempotent() {
        let config = test_config();
        let services = vec![
            service(
                Uuid::from_u128(1),
                "Xpress Streaming Service (BGX)",
                vec![readable_char(Uuid::from_u128(0x10))],
            ),
            service(Uuid::from_u128(2), "Battery Service", vec![]),
        ];

        let first = select_services(&services, &config);
        let second = select_services(&services, &config);
        assert_eq!(first, second);
    }
}
