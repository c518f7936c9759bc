//! Core protocol logic

pub mod cipher;
pub mod client;
pub mod error;
pub mod handshake;
pub mod types;
