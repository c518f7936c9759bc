//! SX3 Client
//!
//! Client for the encrypted BLE GATT protocol spoken by SX3 e-bike
//! electronics modules:
//! - Characteristic registry mapping operations to service/characteristic UUIDs
//! - AES-128-ECB payload engine keyed with the per-bike key
//! - Nonce-challenge authentication handshake
//! - Typed client for lock, power level, bell, sounds and telemetry

pub mod config;
pub mod core;
pub mod protocol;
pub mod transport;

pub use crate::core::{
    cipher::CipherEngine,
    client::Sx3Client,
    error::{ClientError, DecodeError, FormatError, RangeError, TransportError},
    handshake::HandshakeState,
    types::{BellTone, BikeStatus, LockState, Nonce, Sound},
};
pub use protocol::{Characteristic, Service};
pub use transport::GattTransport;
