//! # Scan Target Model
//!
//! A target is either an explicit CIDR block (`192.168.1.0/24`) or the
//! keyword `lan`, which stands for the private IPv4 network of the preferred
//! local interface.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::error::ConfigError;
use crate::network::interface;
use crate::network::range::Subnet;

/// Subnet used when no target is given.
pub const DEFAULT_SUBNET: &str = "192.168.1.0/24";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The network the preferred local interface sits on.
    Lan,
    /// An explicit subnet.
    Subnet(Subnet),
}

impl Default for Target {
    fn default() -> Self {
        match DEFAULT_SUBNET.parse() {
            Ok(subnet) => Target::Subnet(subnet),
            Err(_) => Target::Lan,
        }
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    /// Accepts "lan" (case-insensitive) or CIDR notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("lan") {
            return Ok(Target::Lan);
        }
        s.parse::<Subnet>().map(Target::Subnet)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Lan => f.write_str("lan"),
            Target::Subnet(subnet) => write!(f, "{subnet}"),
        }
    }
}

/// Turns a target into the concrete subnet to sweep.
pub fn resolve(target: &Target) -> anyhow::Result<Subnet> {
    match target {
        Target::Subnet(subnet) => Ok(*subnet),
        Target::Lan => {
            let net = interface::get_lan_network()?;
            let subnet = Subnet::new(net.network(), net.prefix())?;
            info!("Local network detected as {subnet}");
            Ok(subnet)
        }
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
