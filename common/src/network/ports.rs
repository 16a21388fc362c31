//! Port target lists.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Common services probed when no list is given.
pub const DEFAULT_PORTS: &[u16] = &[
    21, 22, 23, 53, 80, 123, 137, 138, 139, 143, 443, 445, 3306, 3389, 5357, 8000, 8080, 8443,
];

/// Ordered, duplicate-free list of TCP ports (1-65535).
///
/// Order is the probe order. It does not affect how results are reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortList {
    ports: Vec<u16>,
}

impl PortList {
    pub fn new(ports: Vec<u16>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPorts {
            input: join(&ports),
            reason,
        };

        if ports.contains(&0) {
            return Err(invalid("port 0 cannot be probed".to_string()));
        }

        let mut seen: HashSet<u16> = HashSet::with_capacity(ports.len());
        if let Some(dup) = ports.iter().find(|port| !seen.insert(**port)) {
            return Err(invalid(format!("port {dup} is listed more than once")));
        }

        Ok(Self { ports })
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.ports
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }
}

impl Default for PortList {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
        }
    }
}

impl FromStr for PortList {
    type Err = ConfigError;

    /// Parses a comma separated list such as "22, 80,443". An empty string is
    /// an empty list (discovery and vendor lookup only).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ports: Vec<u16> = Vec::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let port = part.parse::<u16>().map_err(|e| ConfigError::InvalidPorts {
                input: s.to_string(),
                reason: format!("'{part}' is not a port number: {e}"),
            })?;
            ports.push(port);
        }

        PortList::new(ports).map_err(|e| match e {
            ConfigError::InvalidPorts { reason, .. } => ConfigError::InvalidPorts {
                input: s.to_string(),
                reason,
            },
            other => other,
        })
    }
}

impl fmt::Display for PortList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.ports))
    }
}

/// Renders ports as "22, 80", the format used in reports.
pub fn join(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|port| port.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
