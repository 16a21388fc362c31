//! Fakes shared by the integration tests: a link that answers ARP like a
//! small LAN would, and a scanner that runs discovery over it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use pnet::packet::Packet;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;

use quietmap_common::error::TransportError;
use quietmap_common::network::host::DiscoveryReply;
use quietmap_common::network::range::Subnet;
use quietmap_common::scanning::{NetworkScanner, StopSignal};
use quietmap_common::sender::SenderConfig;
use quietmap_core::network::channel::EthernetLink;
use quietmap_core::network::tcp::Connector;
use quietmap_core::scanner::local::LocalScanner;
use quietmap_protocols::arp::ARP_LEN;
use quietmap_protocols::ethernet::{self, ETH_HDR_LEN, MIN_ETH_FRAME_NO_FCS};

pub const OWN_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);

pub fn mac(last: u8) -> MacAddr {
    MacAddr::new(0x00, 0x1a, 0x2b, 0x00, 0x00, last)
}

pub fn arp_reply(ip: Ipv4Addr, mac: MacAddr, own_ip: Ipv4Addr) -> Vec<u8> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
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
    arp.set_target_proto_addr(own_ip);
    buffer.to_vec()
}

fn requested_addr(frame: &[u8]) -> Option<Ipv4Addr> {
    let eth = EthernetPacket::new(frame)?;
    let arp = ArpPacket::new(eth.payload())?;
    (arp.get_operation() == ArpOperations::Request).then(|| arp.get_target_proto_addr())
}

/// A simulated segment. Every request for a known address is answered
/// `copies` times by each host claiming it.
#[derive(Clone)]
pub struct FakeLan {
    hosts: Vec<DiscoveryReply>,
    copies: usize,
    broken: bool,
}

impl FakeLan {
    pub fn new() -> Self {
        Self {
            hosts: Vec::new(),
            copies: 1,
            broken: false,
        }
    }

    pub fn host(mut self, ip: Ipv4Addr, mac: MacAddr) -> Self {
        self.hosts.push(DiscoveryReply::new(ip, mac));
        self
    }

    pub fn chatty(mut self, copies: usize) -> Self {
        self.copies = copies;
        self
    }

    /// Every send fails, as on an interface that went down mid-scan.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

pub struct FakeLink {
    lan: FakeLan,
    own_ip: Ipv4Addr,
    pending: VecDeque<Vec<u8>>,
}

impl FakeLink {
    pub fn new(lan: FakeLan, own_ip: Ipv4Addr) -> Self {
        Self {
            lan,
            own_ip,
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl EthernetLink for FakeLink {
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.lan.broken {
            return Err(TransportError::Send(io::Error::new(
                io::ErrorKind::NetworkDown,
                "network is down",
            )));
        }
        let Some(target) = requested_addr(frame) else {
            return Ok(());
        };
        for host in self.lan.hosts.iter().filter(|h| h.ip == target) {
            for _ in 0..self.lan.copies {
                self.pending.push_back(arp_reply(host.ip, host.mac, self.own_ip));
            }
        }
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<Vec<u8>> {
        match self.pending.pop_front() {
            Some(frame) => Some(frame),
            None => std::future::pending().await,
        }
    }
}

/// Runs the real discovery loop over a [`FakeLink`].
pub struct FakeLanScanner {
    pub lan: FakeLan,
    pub own_ip: Ipv4Addr,
}

#[async_trait]
impl NetworkScanner for FakeLanScanner {
    async fn discover(
        &self,
        subnet: &Subnet,
        window: Duration,
        stop: &StopSignal,
    ) -> Result<Vec<DiscoveryReply>, TransportError> {
        let link = FakeLink::new(self.lan.clone(), self.own_ip);
        let sender_cfg = SenderConfig::new(OWN_MAC, self.own_ip, subnet);
        LocalScanner::new(link, sender_cfg).run(window, stop).await
    }
}

/// Answers connects from a fixed table of open (host, port) pairs and
/// refuses everything else.
#[derive(Default)]
pub struct TableConnector {
    open: HashMap<Ipv4Addr, HashSet<u16>>,
    hang: bool,
}

impl TableConnector {
    pub fn open(mut self, ip: Ipv4Addr, ports: &[u16]) -> Self {
        self.open.entry(ip).or_default().extend(ports);
        self
    }

    /// Closed ports never answer instead of refusing.
    pub fn filtered(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[async_trait]
impl Connector for TableConnector {
    async fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        let SocketAddr::V4(v4) = addr else {
            return Err(io::ErrorKind::Unsupported.into());
        };
        if self.open.get(v4.ip()).is_some_and(|ports| ports.contains(&v4.port())) {
            return Ok(());
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        Err(io::ErrorKind::ConnectionRefused.into())
    }
}
