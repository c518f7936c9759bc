//! Bluetooth Low Energy transport backed by BlueZ

pub mod adapter;
pub mod device;
pub mod discovery;

pub use {
    adapter::BleAdapter,
    device::BluerTransport,
    discovery::{BikeModel, DiscoveredBike, discover_bike},
};
