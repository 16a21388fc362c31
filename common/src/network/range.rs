use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use pnet::ipnetwork::Ipv4Network;

use crate::error::ConfigError;

/// Shortest prefix accepted as a local broadcast domain.
pub const MIN_PREFIX: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let addr: u32 = addr.into();
        u32::from(self.start_addr) <= addr && addr <= u32::from(self.end_addr)
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        if start > end {
            return 0;
        }
        (end - start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        u32::from(self.start_addr) > u32::from(self.end_addr)
    }
}

/// An IPv4 network on the local link, always stored in normalized form
/// (host bits cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    network: Ipv4Network,
}

impl Subnet {
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSubnet {
            input: format!("{addr}/{prefix}"),
            reason,
        };

        if prefix < MIN_PREFIX {
            return Err(invalid(format!(
                "prefix /{prefix} is wider than a local network (minimum /{MIN_PREFIX})"
            )));
        }

        let raw = Ipv4Network::new(addr, prefix).map_err(|e| invalid(e.to_string()))?;
        let network = Ipv4Network::new(raw.network(), prefix).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { network })
    }

    pub fn network(&self) -> Ipv4Network {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.network.contains(addr)
    }

    /// Addresses worth asking about. Network and broadcast addresses are
    /// skipped unless the prefix leaves nothing else (/31, /32).
    pub fn probe_range(&self) -> Ipv4Range {
        let start: u32 = self.network.network().into();
        let end: u32 = self.network.broadcast().into();

        if self.network.prefix() <= 30 {
            Ipv4Range::new(Ipv4Addr::from(start + 1), Ipv4Addr::from(end - 1))
        } else {
            Ipv4Range::new(Ipv4Addr::from(start), Ipv4Addr::from(end))
        }
    }

    /// Probe addresses in ascending order, minus the scanning host itself.
    pub fn probe_addrs(&self, own_addr: Option<Ipv4Addr>) -> Vec<Ipv4Addr> {
        self.probe_range()
            .to_iter()
            .filter(|addr| Some(*addr) != own_addr)
            .collect()
    }
}

impl FromStr for Subnet {
    type Err = ConfigError;

    /// Parses CIDR notation like "192.168.1.0/24". A bare address is a /32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| ConfigError::InvalidSubnet {
            input: s.to_string(),
            reason,
        };

        let (ip_str, prefix_str) = s.split_once('/').unwrap_or((s, "32"));

        let addr = ip_str
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(format!("invalid address '{ip_str}': {e}")))?;

        let prefix = prefix_str
            .parse::<u8>()
            .map_err(|e| invalid(format!("invalid prefix '{prefix_str}': {e}")))?;

        Subnet::new(addr, prefix).map_err(|e| match e {
            ConfigError::InvalidSubnet { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network.network(), self.network.prefix())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
