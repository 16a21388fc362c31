use std::net::Ipv4Addr;

use anyhow::{Context, ensure};
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;

use quietmap_common::network::host::DiscoveryReply;

use crate::ethernet::{self, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS};

pub const ARP_LEN: usize = 28;

/// Builds a broadcast "who-has `dst_addr`" frame, padded to the Ethernet minimum.
pub fn create_request(
    src_mac: MacAddr,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::make_header(&mut buffer, src_mac, MacAddr::broadcast(), EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .context("failed to create mutable ARP packet")?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(ArpOperations::Request);
    arp_packet.set_sender_hw_addr(src_mac);
    arp_packet.set_target_hw_addr(MacAddr::zero());
    arp_packet.set_sender_proto_addr(src_addr);
    arp_packet.set_target_proto_addr(dst_addr);
    Ok(Vec::from(buffer))
}

/// Extracts the (IP, MAC) pair announced by an ARP reply.
///
/// The MAC comes from the ARP sender hardware field, not the Ethernet
/// source, so proxied replies are attributed to the announced host.
pub fn parse_reply(eth_frame: &EthernetPacket) -> anyhow::Result<DiscoveryReply> {
    ensure!(
        eth_frame.get_ethertype() == EtherTypes::Arp,
        "not an ARP frame (ethertype 0x{:04x})",
        eth_frame.get_ethertype().0
    );
    let arp_packet = ArpPacket::new(eth_frame.payload()).with_context(|| {
        format!(
            "truncated or invalid ARP packet (payload len {})",
            eth_frame.payload().len()
        )
    })?;
    ensure!(
        arp_packet.get_operation() == ArpOperations::Reply,
        "ARP operation {} is not a reply",
        arp_packet.get_operation().0
    );
    ensure!(
        arp_packet.get_hardware_type() == ArpHardwareTypes::Ethernet
            && arp_packet.get_protocol_type() == EtherTypes::Ipv4,
        "ARP reply is not Ethernet/IPv4"
    );

    Ok(DiscoveryReply::new(
        arp_packet.get_sender_proto_addr(),
        arp_packet.get_sender_hw_addr(),
    ))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
