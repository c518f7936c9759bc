//! Bike discovery by advertised service UUIDs

use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport};
use futures::StreamExt;
use std::{collections::HashSet, fmt, time::Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    core::error::{DiscoveryError, DiscoveryResult, TransportError},
    protocol::registry::Service,
};

/// Service advertised by SX1 and SX2 bikes
pub const SX1_SX2_ADVERTISED_SERVICE: Uuid =
    Uuid::from_u128(0x8e7f1a50_087a_44c9_b292_a2c628fdd9aa);

/// Service advertised by Smart SX1 bikes
pub const SMART_SX1_ADVERTISED_SERVICE: Uuid =
    Uuid::from_u128(0x6acb5520_e631_4069_944d_b8ca7598ad50);

/// Bike generations distinguishable from advertisements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BikeModel {
    Sx3,
    Sx1Sx2,
    SmartSx1,
}

impl BikeModel {
    pub const ALL: [BikeModel; 3] = [BikeModel::Sx3, BikeModel::Sx1Sx2, BikeModel::SmartSx1];

    /// Service UUID this model advertises
    pub const fn advertised_service(self) -> Uuid {
        match self {
            BikeModel::Sx3 => Service::BikeInfo.uuid(),
            BikeModel::Sx1Sx2 => SX1_SX2_ADVERTISED_SERVICE,
            BikeModel::SmartSx1 => SMART_SX1_ADVERTISED_SERVICE,
        }
    }

    /// Only SX3 speaks this protocol
    pub fn is_supported(self) -> bool {
        self == BikeModel::Sx3
    }

    /// Classify a device by its advertised services; SX3 wins ties
    pub fn from_advertised(uuids: &HashSet<Uuid>) -> Option<Self> {
        BikeModel::ALL
            .into_iter()
            .find(|model| uuids.contains(&model.advertised_service()))
    }
}

impl fmt::Display for BikeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BikeModel::Sx3 => "SX3",
            BikeModel::Sx1Sx2 => "SX1/SX2",
            BikeModel::SmartSx1 => "Smart SX1",
        })
    }
}

/// A bike seen during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBike {
    pub address: Address,
    pub model: BikeModel,
    pub name: Option<String>,
}

/// Scan until the first supported bike shows up
///
/// Unsupported bikes are logged and skipped. If only unsupported bikes were
/// seen when the timeout expires, the last one is reported.
pub async fn discover_bike(
    adapter: &Adapter,
    timeout: Duration,
) -> DiscoveryResult<DiscoveredBike> {
    let mut filter = DiscoveryFilter::default();
    filter.transport = DiscoveryTransport::Le;
    filter.uuids = BikeModel::ALL
        .into_iter()
        .map(BikeModel::advertised_service)
        .collect();
    adapter
        .set_discovery_filter(filter)
        .await
        .map_err(TransportError::from)?;

    info!("Scanning for bikes for up to {:?}", timeout);
    let events = adapter
        .discover_devices()
        .await
        .map_err(TransportError::from)?;
    let mut events = std::pin::pin!(events);
    let mut unsupported: Option<DiscoveredBike> = None;

    let scan = async {
        while let Some(event) = events.next().await {
            let AdapterEvent::DeviceAdded(address) = event else {
                continue;
            };

            let device = adapter.device(address)?;
            let uuids = device.uuids().await?.unwrap_or_default();
            let Some(model) = BikeModel::from_advertised(&uuids) else {
                debug!("Ignoring device {}", address);
                continue;
            };

            let bike = DiscoveredBike {
                address,
                model,
                name: device.name().await?,
            };

            if model.is_supported() {
                info!("Found {} at {}", model, address);
                return Ok(Some(bike));
            }

            warn!("Found {} at {}, which is not supported", model, address);
            unsupported = Some(bike);
        }
        Ok::<_, TransportError>(None)
    };

    let found = match tokio::time::timeout(timeout, scan).await {
        Ok(result) => result?,
        Err(_) => None,
    };

    match (found, unsupported) {
        (Some(bike), _) => Ok(bike),
        (None, Some(bike)) => Err(DiscoveryError::Unsupported {
            model: bike.model.to_string(),
            address: bike.address.to_string(),
        }),
        (None, None) => Err(DiscoveryError::NotFound(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertised_service_uuids() {
        assert_eq!(
            BikeModel::Sx3.advertised_service().to_string(),
            "6acc5540-e631-4069-944d-b8ca7598ad50"
        );
        assert_eq!(
            BikeModel::Sx1Sx2.advertised_service().to_string(),
            "8e7f1a50-087a-44c9-b292-a2c628fdd9aa"
        );
        assert_eq!(
            BikeModel::SmartSx1.advertised_service().to_string(),
            "6acb5520-e631-4069-944d-b8ca7598ad50"
        );
    }

    #[test]
    fn test_classify_advertisement() {
        let sx3: HashSet<Uuid> = [Service::BikeInfo.uuid()].into();
        assert_eq!(BikeModel::from_advertised(&sx3), Some(BikeModel::Sx3));

        let sx2: HashSet<Uuid> = [SX1_SX2_ADVERTISED_SERVICE].into();
        assert_eq!(BikeModel::from_advertised(&sx2), Some(BikeModel::Sx1Sx2));
        assert!(!BikeModel::Sx1Sx2.is_supported());

        let unknown: HashSet<Uuid> = [Service::Security.uuid()].into();
        assert_eq!(BikeModel::from_advertised(&unknown), None);
        assert_eq!(BikeModel::from_advertised(&HashSet::new()), None);
    }

    #[test]
    fn test_sx3_wins_over_older_models() {
        let both: HashSet<Uuid> = [SMART_SX1_ADVERTISED_SERVICE, Service::BikeInfo.uuid()].into();
        assert_eq!(BikeModel::from_advertised(&both), Some(BikeModel::Sx3));
    }
}
