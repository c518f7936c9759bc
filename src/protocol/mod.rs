//! SX3 wire protocol: characteristic registry and payload encodings

pub mod payload;
pub mod registry;

pub use registry::{Characteristic, Service};
