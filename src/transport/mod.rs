//! Transport layer

pub mod ble;
pub mod gatt;
pub mod mock_transport;

pub use gatt::GattTransport;
pub use mock_transport::{MockTransport, TransportCall};
