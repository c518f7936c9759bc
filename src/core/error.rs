//! Error types for the SX3 protocol client

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result type for GATT transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for cipher operations
pub type CipherResult<T> = Result<T, FormatError>;

/// Result type for protocol client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for bike discovery
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Argument rejected before any I/O was issued
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Power level {0} outside supported range 0..=5")]
    PowerLevel(i32),

    #[error("Sound repeat count must be at least 1")]
    RepeatCount,
}

/// Malformed cipher input or key material
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Ciphertext length {0} is not a multiple of 16 bytes")]
    UnalignedCiphertext(usize),

    #[error("Plaintext length {0} is not a multiple of 16 bytes")]
    UnalignedPlaintext(usize),

    #[error("Invalid key length: expected 16 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),
}

/// Device payload that could not be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown lock state byte 0x{0:02x}")]
    UnknownLockState(u8),

    #[error("Unknown bell tone byte 0x{0:02x}")]
    UnknownBellTone(u8),

    #[error("Unknown sound byte 0x{0:02x}")]
    UnknownSound(u8),

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Payload is not valid ASCII")]
    InvalidAscii,

    #[error("Nonce too short: expected 2 bytes, got {0}")]
    ShortNonce(usize),

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Integer payload does not fit in 128 bits")]
    IntegerOverflow,
}

/// Errors raised by the GATT transport, passed through unmodified
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Service {0} not found on device")]
    ServiceNotFound(Uuid),

    #[error("Characteristic {0} not found on device")]
    CharacteristicNotFound(Uuid),

    #[error("Operation not permitted: {0}")]
    NotPermitted(String),

    #[error("Device not connected")]
    NotConnected,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("BLE error: {0}")]
    Ble(String),
}

/// Errors surfaced by the protocol client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while scanning for a bike
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No supported bike found within {0:?}")]
    NotFound(Duration),

    #[error("Found {model} at {address}, which is not supported")]
    Unsupported { model: String, address: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors in command-line configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid Bluetooth address: {0}")]
    InvalidAddress(String),

    #[error("Invalid bike key: {0}")]
    InvalidKey(#[from] FormatError),

    #[error("A bike key is required for this command (--key or SX3_KEY)")]
    MissingKey,
}
