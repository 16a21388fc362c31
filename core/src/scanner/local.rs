//! A **local area network (LAN)** scanner.
//!
//! Sends one ARP request per target address, then collects replies until the
//! discovery window closes. Raw Layer 2 access needs root privileges (or
//! CAP_NET_RAW) when running against a real interface.

use std::time::Duration;

use anyhow::ensure;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, trace};

use quietmap_common::error::TransportError;
use quietmap_common::network::host::DiscoveryReply;
use quietmap_common::scanning::StopSignal;
use quietmap_common::sender::SenderConfig;
use quietmap_protocols as protocol;

use crate::network::channel::EthernetLink;
use crate::timing::STOP_POLL_INTERVAL;

use super::ReplyCollector;

pub struct LocalScanner<L: EthernetLink> {
    link: L,
    sender_cfg: SenderConfig,
    collector: ReplyCollector,
}

impl<L: EthernetLink> LocalScanner<L> {
    pub fn new(link: L, sender_cfg: SenderConfig) -> Self {
        Self {
            link,
            sender_cfg,
            collector: ReplyCollector::new(),
        }
    }

    /// Sweeps every target once, then listens for `window`.
    pub async fn run(
        mut self,
        window: Duration,
        stop: &StopSignal,
    ) -> Result<Vec<DiscoveryReply>, TransportError> {
        self.send_discovery_packets()?;

        let deadline = Instant::now() + window;

        while self.should_continue(stop) {
            let frame = tokio::select! {
                frame = self.link.recv_frame() => frame,
                _ = sleep_until(deadline) => break,
                _ = sleep(STOP_POLL_INTERVAL) => continue,
            };

            match frame {
                Some(bytes) => {
                    if let Err(e) = self.process_eth_packet(&bytes) {
                        trace!("Ignoring frame: {e}");
                    }
                }
                None => break,
            }
        }

        debug!(
            "Collected {} of {} possible replies",
            self.collector.len(),
            self.sender_cfg.len()
        );
        Ok(self.collector.into_replies())
    }

    fn send_discovery_packets(&mut self) -> Result<(), TransportError> {
        let packets: Vec<Vec<u8>> = protocol::create_ethernet_packets(&self.sender_cfg)
            .map_err(|e| TransportError::Frame(e.to_string()))?;
        for packet in packets {
            self.link.send_frame(&packet)?;
        }
        Ok(())
    }

    fn process_eth_packet(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        let reply = protocol::handle_frame(bytes)?;
        ensure!(
            self.sender_cfg.has_addr(&reply.ip),
            "{} is not in the swept range",
            reply.ip
        );
        ensure!(reply.mac != self.sender_cfg.src_mac, "reply from ourselves");

        if self.collector.offer(reply) {
            debug!("{} is at {}", reply.ip, reply.mac);
        } else {
            trace!("Duplicate reply from {} ({})", reply.ip, reply.mac);
        }
        Ok(())
    }

    fn should_continue(&self, stop: &StopSignal) -> bool {
        let not_stopped: bool = !stop.is_stopped();
        let work_remains: bool = self.sender_cfg.len() > self.collector.len();

        not_stopped && work_remains
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

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket};
    use pnet::packet::ethernet::EtherTypes;
    use pnet::util::MacAddr;
    use quietmap_common::network::range::Subnet;
    use quietmap_protocols::arp::ARP_LEN;
    use quietmap_protocols::ethernet::{self, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS};
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;

    const OWN_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x01);

    /// Delivers each scripted frame at its offset from link creation, then goes quiet.
    struct ScriptedLink {
        sent: usize,
        origin: Instant,
        script: VecDeque<(Duration, Vec<u8>)>,
    }

    #[async_trait]
    impl EthernetLink for ScriptedLink {
        fn send_frame(&mut self, _frame: &[u8]) -> Result<(), TransportError> {
            self.sent += 1;
            Ok(())
        }

        async fn recv_frame(&mut self) -> Option<Vec<u8>> {
            match self.script.front() {
                Some((offset, _)) => {
                    sleep_until(self.origin + *offset).await;
                    self.script.pop_front().map(|(_, frame)| frame)
                }
                None => std::future::pending().await,
            }
        }
    }

    fn arp_reply(ip: Ipv4Addr, mac: MacAddr) -> Vec<u8> {
        let mut buffer = vec![0u8; MIN_ETH_FRAME_NO_FCS];
        ethernet::make_header(&mut buffer, mac, OWN_MAC, EtherTypes::Arp).unwrap();
        let mut arp = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN]).unwrap();
        arp.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp.set_protocol_type(EtherTypes::Ipv4);
        arp.set_hw_addr_len(6);
        arp.set_proto_addr_len(4);
        arp.set_operation(ArpOperations::Reply);
        arp.set_sender_hw_addr(mac);
        arp.set_sender_proto_addr(ip);
        arp.set_target_hw_addr(OWN_MAC);
        arp.set_target_proto_addr(Ipv4Addr::new(10, 0, 0, 1));
        buffer
    }

    fn scanner(script: Vec<(Duration, Vec<u8>)>) -> LocalScanner<ScriptedLink> {
        let subnet: Subnet = "10.0.0.0/29".parse().unwrap();
        let cfg = SenderConfig::new(OWN_MAC, Ipv4Addr::new(10, 0, 0, 1), &subnet);
        LocalScanner::new(
            ScriptedLink {
                sent: 0,
                origin: Instant::now(),
                script: script.into(),
            },
            cfg,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn silent_network_returns_empty_after_window() {
        let start = Instant::now();
        let replies = scanner(vec![])
            .run(Duration::from_secs(2), &StopSignal::new())
            .await
            .unwrap();

        assert!(replies.is_empty());
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(2) + STOP_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn late_replies_are_discarded() {
        let host = Ipv4Addr::new(10, 0, 0, 2);
        let mac = MacAddr::new(0xaa, 0xbb, 0xcc, 0, 0, 2);
        let replies = scanner(vec![
            (Duration::from_millis(200), arp_reply(host, mac)),
            (
                Duration::from_secs(3),
                arp_reply(Ipv4Addr::new(10, 0, 0, 3), MacAddr::new(0xaa, 0xbb, 0xcc, 0, 0, 3)),
            ),
        ])
        .run(Duration::from_secs(1), &StopSignal::new())
        .await
        .unwrap();

        assert_eq!(replies, vec![DiscoveryReply::new(host, mac)]);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_and_own_replies_are_ignored() {
        let replies = scanner(vec![
            (
                Duration::from_millis(10),
                arp_reply(Ipv4Addr::new(10, 0, 1, 2), MacAddr::new(1, 1, 1, 1, 1, 1)),
            ),
            (Duration::from_millis(20), arp_reply(Ipv4Addr::new(10, 0, 0, 4), OWN_MAC)),
            (Duration::from_millis(30), vec![0xff; 20]),
        ])
        .run(Duration::from_secs(1), &StopSignal::new())
        .await
        .unwrap();

        assert!(replies.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_early_once_every_target_answered() {
        let script: Vec<(Duration, Vec<u8>)> = (2..=6)
            .map(|last| {
                (
                    Duration::from_millis(10),
                    arp_reply(Ipv4Addr::new(10, 0, 0, last), MacAddr::new(0xaa, 0, 0, 0, 0, last)),
                )
            })
            .collect();

        let start = Instant::now();
        let replies = scanner(script)
            .run(Duration::from_secs(30), &StopSignal::new())
            .await
            .unwrap();

        assert_eq!(replies.len(), 5);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_ends_collection() {
        let stop = StopSignal::new();
        stop.stop();

        let start = Instant::now();
        let replies = scanner(vec![]).run(Duration::from_secs(30), &stop).await.unwrap();

        assert!(replies.is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn one_request_per_target() {
        let mut scanner = scanner(vec![]);
        scanner.send_discovery_packets().unwrap();
        assert_eq!(scanner.link.sent, 5);
    }
}
