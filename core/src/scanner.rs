//! Link-layer host discovery.
//!
//! [`ArpScanner`] is the production [`NetworkScanner`]: it picks the interface
//! attached to the requested subnet, opens a raw channel on it and hands the
//! sweep to a [`local::LocalScanner`].

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use pnet::util::MacAddr;
use tracing::info;

use quietmap_common::error::TransportError;
use quietmap_common::network::host::DiscoveryReply;
use quietmap_common::network::interface;
use quietmap_common::network::range::Subnet;
use quietmap_common::scanning::{NetworkScanner, StopSignal};
use quietmap_common::sender::SenderConfig;

use crate::network::channel;

pub mod local;

use local::LocalScanner;

/// Discovers hosts by ARP on the interface attached to the subnet.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArpScanner;

#[async_trait]
impl NetworkScanner for ArpScanner {
    async fn discover(
        &self,
        subnet: &Subnet,
        window: Duration,
        stop: &StopSignal,
    ) -> Result<Vec<DiscoveryReply>, TransportError> {
        let selected = interface::select_for_subnet(subnet)?;
        let sender_cfg = SenderConfig::from_selected(&selected, subnet)?;
        info!(
            "Sweeping {} address(es) on {} from {}",
            sender_cfg.len(),
            selected.interface.name,
            selected.source_addr
        );

        let eth_handle = channel::start_capture(&selected.interface)?;
        LocalScanner::new(eth_handle, sender_cfg).run(window, stop).await
    }
}

/// Keeps the first reply for every IP and every MAC, in arrival order.
#[derive(Debug, Default)]
pub struct ReplyCollector {
    replies: Vec<DiscoveryReply>,
    seen_ips: HashSet<Ipv4Addr>,
    seen_macs: HashSet<MacAddr>,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the reply repeats an IP or MAC already seen.
    pub fn offer(&mut self, reply: DiscoveryReply) -> bool {
        if self.seen_ips.contains(&reply.ip) || self.seen_macs.contains(&reply.mac) {
            return false;
        }
        self.seen_ips.insert(reply.ip);
        self.seen_macs.insert(reply.mac);
        self.replies.push(reply);
        true
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn into_replies(self) -> Vec<DiscoveryReply> {
        self.replies
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
