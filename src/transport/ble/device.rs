//! GATT transport over a connected BlueZ device

use bluer::{
    Device, ErrorKind,
    gatt::{
        WriteOp,
        remote::{Characteristic, CharacteristicWriteRequest},
    },
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    core::error::{TransportError, TransportResult},
    transport::GattTransport,
};

impl From<bluer::Error> for TransportError {
    fn from(err: bluer::Error) -> Self {
        classify(err.kind, err.message)
    }
}

/// Permission failures stay distinguishable from other BlueZ errors
fn classify(kind: ErrorKind, message: String) -> TransportError {
    match kind {
        ErrorKind::NotAuthorized | ErrorKind::NotPermitted => TransportError::NotPermitted(message),
        ErrorKind::NotConnected => TransportError::NotConnected,
        other => TransportError::Ble(format!("{other:?}: {message}")),
    }
}

/// GATT transport backed by a bluer remote device
///
/// Resolved characteristics are cached per `(service, characteristic)` pair
/// for the lifetime of the connection.
pub struct BluerTransport {
    device: Device,
    characteristics: RwLock<HashMap<(Uuid, Uuid), Characteristic>>,
}

impl BluerTransport {
    /// Wrap an already connected device
    pub fn new(device: Device) -> Self {
        Self {
            device,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Disconnect from the device
    pub async fn disconnect(&self) -> TransportResult<()> {
        info!("Disconnecting from {}", self.device.address());
        self.characteristics.write().await.clear();
        self.device.disconnect().await?;
        Ok(())
    }

    /// Find a remote characteristic by service and characteristic UUID
    async fn characteristic(&self, service: Uuid, uuid: Uuid) -> TransportResult<Characteristic> {
        if let Some(characteristic) = self.characteristics.read().await.get(&(service, uuid)) {
            return Ok(characteristic.clone());
        }

        for remote_service in self.device.services().await? {
            if remote_service.uuid().await? != service {
                continue;
            }

            for characteristic in remote_service.characteristics().await? {
                if characteristic.uuid().await? == uuid {
                    debug!("Resolved characteristic {}", uuid);
                    self.characteristics
                        .write()
                        .await
                        .insert((service, uuid), characteristic.clone());
                    return Ok(characteristic);
                }
            }

            return Err(TransportError::CharacteristicNotFound(uuid));
        }

        Err(TransportError::ServiceNotFound(service))
    }
}

impl GattTransport for BluerTransport {
    async fn read(&self, service: Uuid, characteristic: Uuid) -> TransportResult<Vec<u8>> {
        let remote = self.characteristic(service, characteristic).await?;
        let value = remote.read().await?;
        debug!("GATT read {} ({} bytes)", characteristic, value.len());
        Ok(value)
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> TransportResult<()> {
        let remote = self.characteristic(service, characteristic).await?;

        let mut request = CharacteristicWriteRequest::default();
        request.op_type = WriteOp::Request;
        remote.write_ext(value, &request).await?;

        debug!("GATT write {} ({} bytes)", characteristic, value.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_errors_map_to_not_permitted() {
        let err = classify(ErrorKind::NotAuthorized, "denied".to_string());
        assert!(matches!(err, TransportError::NotPermitted(msg) if msg == "denied"));

        let err = classify(ErrorKind::NotPermitted, "read only".to_string());
        assert!(matches!(err, TransportError::NotPermitted(_)));
    }

    #[test]
    fn test_other_errors_map_to_ble() {
        let err = classify(ErrorKind::NotConnected, String::new());
        assert!(matches!(err, TransportError::NotConnected));

        let err = classify(ErrorKind::Failed, "boom".to_string());
        assert!(matches!(err, TransportError::Ble(msg) if msg.contains("boom")));
    }
}
