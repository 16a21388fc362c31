use std::net::Ipv4Addr;

use pnet::util::MacAddr;

use crate::UNKNOWN_VENDOR;
use crate::network::{mac, ports};

/// An (IP, MAC) pair observed in one discovery round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveryReply {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

impl DiscoveryReply {
    pub fn new(ip: Ipv4Addr, mac: MacAddr) -> Self {
        Self { ip, mac }
    }
}

/// One row of the inventory.
///
/// Built once per discovered MAC address and handed to sinks by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub vendor: String,
    /// Open ports, in probe order.
    pub open_ports: Vec<u16>,
    /// False when the scan budget ran out before every port was attempted.
    pub probe_complete: bool,
}

impl HostRecord {
    pub fn new(reply: DiscoveryReply) -> Self {
        Self {
            ip: reply.ip,
            mac: reply.mac,
            vendor: UNKNOWN_VENDOR.to_string(),
            open_ports: Vec::new(),
            probe_complete: true,
        }
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn with_open_ports(mut self, open_ports: Vec<u16>, probe_complete: bool) -> Self {
        self.open_ports = open_ports;
        self.probe_complete = probe_complete;
        self
    }

    pub fn mac_string(&self) -> String {
        mac::to_canonical(self.mac)
    }

    /// "22, 80", or "None" when nothing answered.
    pub fn open_ports_string(&self) -> String {
        if self.open_ports.is_empty() {
            "None".to_string()
        } else {
            ports::join(&self.open_ports)
        }
    }
}
