//! Frame builders and parsers for the link-layer discovery sweep.

pub mod arp;
pub mod ethernet;

use quietmap_common::network::host::DiscoveryReply;
use quietmap_common::sender::SenderConfig;

/// One ARP request per target address, in target order.
pub fn create_ethernet_packets(sender_cfg: &SenderConfig) -> anyhow::Result<Vec<Vec<u8>>> {
    sender_cfg
        .targets()
        .iter()
        .map(|dst_addr| arp::create_request(sender_cfg.src_mac, sender_cfg.src_addr, *dst_addr))
        .collect()
}

/// Decodes a captured frame into a discovery reply, if it is one.
pub fn handle_frame(bytes: &[u8]) -> anyhow::Result<DiscoveryReply> {
    let eth_frame = ethernet::get_packet_from_u8(bytes)?;
    arp::parse_reply(&eth_frame)
}
