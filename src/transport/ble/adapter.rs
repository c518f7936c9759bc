//! BLE adapter management

use bluer::{Adapter, Address, Session};
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    core::error::{DiscoveryResult, TransportError, TransportResult},
    transport::ble::{
        device::BluerTransport,
        discovery::{DiscoveredBike, discover_bike},
    },
};

/// Interval between checks for resolved GATT services
const SERVICES_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Local Bluetooth adapter used to reach the bike
pub struct BleAdapter {
    // Keeps the D-Bus connection alive for the adapter's lifetime
    _session: Session,
    adapter: Adapter,
}

impl BleAdapter {
    /// Open the named adapter, or the default one, and power it on
    pub async fn new(name: Option<&str>) -> TransportResult<Self> {
        let session = Session::new().await?;
        let adapter = match name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };

        info!("Using BLE adapter: {}", adapter.name());
        adapter.set_powered(true).await?;

        Ok(Self {
            _session: session,
            adapter,
        })
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Scan for the first supported bike
    pub async fn discover(&self, timeout: Duration) -> DiscoveryResult<DiscoveredBike> {
        discover_bike(&self.adapter, timeout).await
    }

    /// Connect to a bike and wait until its GATT services are resolved
    pub async fn connect(
        &self,
        address: Address,
        timeout: Duration,
    ) -> TransportResult<BluerTransport> {
        let device = self.adapter.device(address)?;

        if !device.is_connected().await? {
            info!("Connecting to {}", address);
            tokio::time::timeout(timeout, device.connect())
                .await
                .map_err(|_| TransportError::Timeout(format!("connecting to {address}")))??;
        }

        let resolve = async {
            while !device.is_services_resolved().await? {
                tokio::time::sleep(SERVICES_POLL_INTERVAL).await;
            }
            Ok::<_, TransportError>(())
        };
        tokio::time::timeout(timeout, resolve)
            .await
            .map_err(|_| TransportError::Timeout(format!("resolving services of {address}")))??;

        debug!("GATT services of {} resolved", address);
        info!("Connected to {}", address);
        Ok(BluerTransport::new(device))
    }
}
