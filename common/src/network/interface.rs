use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use tracing::debug;

#[cfg(target_os = "linux")]
use linux_impl::{is_physical, is_wireless};
#[cfg(target_os = "macos")]
use macos_impl::{is_physical, is_wireless};
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
use fallback_impl::{is_physical, is_wireless};

use crate::error::TransportError;
use crate::network::range::Subnet;
use crate::utils::interface::NetworkInterfaceExtension;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ViabilityError {
    /// The interface is operationally down.
    IsDown,
    /// Loopback devices never answer ARP.
    IsLoopback,
    /// The interface does not have a MAC address.
    NoMacAddress,
    /// The interface does not support broadcast (required for ARP).
    NotBroadcast,
    /// The interface is a point-to-point link (e.g., a VPN).
    IsPointToPoint,
    /// The interface has no IPv4 address to source ARP requests from.
    NoIpv4Address,
}

/// An interface chosen to sweep a subnet, and the address requests are sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedInterface {
    pub interface: NetworkInterface,
    pub source_addr: Ipv4Addr,
    pub network: Ipv4Network,
}

/// Interfaces able to carry an ARP sweep, wired and physical ones first.
pub fn get_lan_interfaces() -> Vec<NetworkInterface> {
    let mut interfaces: Vec<NetworkInterface> = pnet::datalink::interfaces()
        .into_iter()
        .filter(|interface| is_viable_lan_interface(interface).is_ok())
        .collect();
    interfaces.sort_by_key(|interface| rank(interface, is_physical, is_wired));
    interfaces
}

/// Finds the private IPv4 network of the preferred LAN interface.
pub fn get_lan_network() -> Result<Ipv4Network, TransportError> {
    let interfaces: Vec<NetworkInterface> = get_lan_interfaces()
        .into_iter()
        .filter(|interface| interface.get_ipv4_nets().iter().any(|net| net.ip().is_private()))
        .collect();

    let interface = select_best_lan_interface(interfaces, is_wired).ok_or_else(|| {
        TransportError::NoInterface {
            subnet: "lan".to_string(),
        }
    })?;

    interface
        .get_ipv4_nets()
        .into_iter()
        .find(|net| net.ip().is_private())
        .ok_or_else(|| TransportError::NoInterface {
            subnet: "lan".to_string(),
        })
}

/// Picks the interface attached to `subnet` on this host.
pub fn select_for_subnet(subnet: &Subnet) -> Result<SelectedInterface, TransportError> {
    select_from(pnet::datalink::interfaces(), subnet, is_wired)
}

fn select_from(
    interfaces: Vec<NetworkInterface>,
    subnet: &Subnet,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Result<SelectedInterface, TransportError> {
    let candidates: Vec<(NetworkInterface, Ipv4Network)> = interfaces
        .into_iter()
        .filter(|interface| match is_viable_lan_interface(interface) {
            Ok(()) => true,
            Err(reason) => {
                debug!("skipping interface {}: {reason:?}", interface.name);
                false
            }
        })
        .filter_map(|interface| {
            let net = interface
                .get_ipv4_nets()
                .into_iter()
                .find(|net| attaches_to(net, subnet))?;
            Some((interface, net))
        })
        .collect();

    let chosen = candidates
        .iter()
        .find(|(interface, _)| is_wired(interface))
        .or_else(|| candidates.first())
        .cloned();

    match chosen {
        Some((interface, network)) => Ok(SelectedInterface {
            source_addr: network.ip(),
            interface,
            network,
        }),
        None => Err(TransportError::NoInterface {
            subnet: subnet.to_string(),
        }),
    }
}

/// True when `net` and `subnet` share a broadcast domain.
fn attaches_to(net: &Ipv4Network, subnet: &Subnet) -> bool {
    net.contains(subnet.network().network()) || subnet.contains(net.ip())
}

fn is_viable_lan_interface(interface: &NetworkInterface) -> Result<(), ViabilityError> {
    if !interface.is_up() {
        return Err(ViabilityError::IsDown);
    }
    if interface.is_loopback() {
        return Err(ViabilityError::IsLoopback);
    }
    if interface.mac.is_none() {
        return Err(ViabilityError::NoMacAddress);
    }
    if !interface.is_broadcast() {
        return Err(ViabilityError::NotBroadcast);
    }
    if interface.is_point_to_point() {
        return Err(ViabilityError::IsPointToPoint);
    }
    let has_ipv4 = interface.ips.iter().any(|net| match net {
        IpNetwork::V4(ipv4) => !ipv4.ip().is_loopback(),
        IpNetwork::V6(_) => false,
    });
    if !has_ipv4 {
        return Err(ViabilityError::NoIpv4Address);
    }

    Ok(())
}

fn select_best_lan_interface(
    interfaces: Vec<NetworkInterface>,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> Option<NetworkInterface> {
    match interfaces.len() {
        0 => None,
        1 => Some(interfaces[0].clone()),
        _ => interfaces
            .iter()
            .find(|&interface| is_wired(interface))
            .cloned()
            .or(Some(interfaces[0].clone())),
    }
}

fn rank(
    interface: &NetworkInterface,
    is_physical: impl Fn(&NetworkInterface) -> bool,
    is_wired: impl Fn(&NetworkInterface) -> bool,
) -> u8 {
    match (is_physical(interface), is_wired(interface)) {
        (true, true) => 0,
        (true, false) => 1,
        _ => 2,
    }
}

fn is_wired(interface: &NetworkInterface) -> bool {
    is_physical(interface) && !is_wireless(interface)
}

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::Path;

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/device", interface.name)).exists()
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        Path::new(&format!("/sys/class/net/{}/wireless", interface.name)).exists()
    }
}

#[cfg(target_os = "macos")]
mod macos_impl {
    use super::*;
    use std::collections::HashSet;
    use std::process::Command;
    use std::sync::OnceLock;

    struct HardwareInfo {
        physical_devices: HashSet<String>,
        wireless_devices: HashSet<String>,
    }

    /// Runs `networksetup` once and caches the answer.
    fn get_hardware_info() -> &'static HardwareInfo {
        static HARDWARE_INFO: OnceLock<HardwareInfo> = OnceLock::new();

        HARDWARE_INFO.get_or_init(|| {
            let mut physical = HashSet::new();
            let mut wireless = HashSet::new();

            if let Ok(output) = Command::new("networksetup").arg("-listallhardwareports").output() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for line in stdout.lines() {
                    if let Some(device) = line.strip_prefix("Device: ") {
                        physical.insert(device.trim().to_string());
                    }
                }
            }

            for device in &physical {
                let is_wifi = Command::new("networksetup")
                    .arg("-getairportnetwork")
                    .arg(device)
                    .output()
                    .map(|out| out.status.success())
                    .unwrap_or(false);

                if is_wifi {
                    wireless.insert(device.clone());
                }
            }

            HardwareInfo {
                physical_devices: physical,
                wireless_devices: wireless,
            }
        })
    }

    pub fn is_physical(interface: &NetworkInterface) -> bool {
        get_hardware_info().physical_devices.contains(&interface.name)
    }

    pub fn is_wireless(interface: &NetworkInterface) -> bool {
        get_hardware_info().wireless_devices.contains(&interface.name)
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod fallback_impl {
    use super::*;

    pub fn is_physical(_interface: &NetworkInterface) -> bool {
        true
    }

    pub fn is_wireless(_interface: &NetworkInterface) -> bool {
        false
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
