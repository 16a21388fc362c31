use std::collections::HashSet;
use std::net::Ipv4Addr;

use pnet::util::MacAddr;

use crate::error::TransportError;
use crate::network::interface::SelectedInterface;
use crate::network::range::Subnet;

/// Everything needed to build the request frames of one sweep.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub src_mac: MacAddr,
    pub src_addr: Ipv4Addr,
    targets: Vec<Ipv4Addr>,
    target_set: HashSet<Ipv4Addr>,
}

impl SenderConfig {
    pub fn new(src_mac: MacAddr, src_addr: Ipv4Addr, subnet: &Subnet) -> Self {
        let targets: Vec<Ipv4Addr> = subnet.probe_addrs(Some(src_addr));
        let target_set: HashSet<Ipv4Addr> = targets.iter().copied().collect();
        Self {
            src_mac,
            src_addr,
            targets,
            target_set,
        }
    }

    pub fn from_selected(
        selected: &SelectedInterface,
        subnet: &Subnet,
    ) -> Result<Self, TransportError> {
        let src_mac = selected
            .interface
            .mac
            .ok_or_else(|| TransportError::Frame(format!(
                "interface {} has no MAC address",
                selected.interface.name
            )))?;
        Ok(Self::new(src_mac, selected.source_addr, subnet))
    }

    /// Addresses to send requests to, in ascending order.
    pub fn targets(&self) -> &[Ipv4Addr] {
        &self.targets
    }

    pub fn has_addr(&self, addr: &Ipv4Addr) -> bool {
        self.target_set.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
