//! Shared model for quietmap: configuration, the error taxonomy, subnet and
//! port types, interface selection, and the traits the core engine is built on.

pub mod config;
pub mod error;
pub mod network;
pub mod scanning;
pub mod sender;
pub mod utils;
pub mod vendors;

/// Vendor placeholder used whenever a MAC address cannot be resolved.
pub const UNKNOWN_VENDOR: &str = "Unknown";
