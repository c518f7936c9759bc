//! GATT transport trait definition

use trait_variant::make;
use uuid::Uuid;

use crate::core::error::TransportResult;

/// Abstraction over a connected BLE GATT client
///
/// The protocol client only ever reads and writes whole characteristic
/// values addressed by service and characteristic UUID. Connection
/// management, timeouts and cancellation belong to the implementation.
#[make(Send)]
pub trait GattTransport: Send + Sync + 'static {
    /// Read the current value of a characteristic
    async fn read(&self, service: Uuid, characteristic: Uuid) -> TransportResult<Vec<u8>>;

    /// Write a value to a characteristic, waiting for the device's response
    async fn write(&self, service: Uuid, characteristic: Uuid, value: &[u8])
    -> TransportResult<()>;
}
