//! Error taxonomy.
//!
//! Only [`TransportError`], [`SinkError`] and [`ConfigError`] ever reach the
//! top level. [`ProbeError`] and [`LookupError`] are absorbed where they occur
//! and replaced with "closed" and "Unknown" respectively.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The link layer could not be used. Fatal to a scan.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no usable network interface is attached to {subnet}")]
    NoInterface { subnet: String },

    #[error("failed to open a datalink channel on {interface}: {source}")]
    Channel {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("datalink channel on {interface} is not an ethernet channel")]
    UnsupportedChannel { interface: String },

    #[error("failed to send frame: {0}")]
    Send(#[source] io::Error),

    #[error("failed to build frame: {0}")]
    Frame(String),
}

impl TransportError {
    /// True when the operating system refused raw socket access.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            TransportError::Channel { source, .. } | TransportError::Send(source) => {
                source.kind() == io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}

/// A single connect attempt did not complete. Always recorded as "closed".
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("{addr} did not answer within {timeout:?}")]
    Timeout { addr: SocketAddr, timeout: Duration },

    #[error("{addr} refused the connection")]
    Refused { addr: SocketAddr },

    #[error("{addr} is unreachable: {source}")]
    Unreachable {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("scan budget exhausted before {addr} was attempted")]
    Cancelled { addr: SocketAddr },
}

/// A vendor could not be determined. Always recorded as [`crate::UNKNOWN_VENDOR`].
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no vendor registered for {mac}")]
    NotFound { mac: String },

    #[error("no vendor dataset is loaded")]
    DatasetUnavailable,

    #[error("vendor dataset refresh failed: {0}")]
    Refresh(String),

    #[error("vendor dataset could not be parsed: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The report could not be written.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode report {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

/// Rejected configuration, detected before any packet leaves the host.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid subnet '{input}': {reason}")]
    InvalidSubnet { input: String, reason: String },

    #[error("invalid port list '{input}': {reason}")]
    InvalidPorts { input: String, reason: String },

    #[error("invalid duration for {field}: {reason}")]
    InvalidDuration { field: &'static str, reason: String },

    #[error("{field} must be at least 1")]
    ZeroConcurrency { field: &'static str },
}

/// Errors that end an inventory run.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("discovery failed: {0}")]
    Transport(#[from] TransportError),

    #[error("reporting failed: {0}")]
    Sink(#[from] SinkError),
}
