//! Core types shared across the bridge

pub mod error;

pub use error::{BridgeError, BridgeResult, ErrorResponse};
