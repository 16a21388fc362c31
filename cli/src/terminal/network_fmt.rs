use crate::terminal::{colors, print};
use colored::*;
use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::Ipv4Network;
use quietmap_common::network::host::HostRecord;
use quietmap_common::network::range::Subnet;
use quietmap_common::utils::interface::NetworkInterfaceExtension;

type Detail = (String, ColoredString);

pub fn to_key_value_pair_net(ip_nets: &[Ipv4Network]) -> Vec<Detail> {
    ip_nets
        .iter()
        .map(|ipv4_network| {
            let address: ColoredString = ipv4_network.ip().to_string().color(colors::IPV4_ADDR);
            let prefix: ColoredString =
                ipv4_network.prefix().to_string().color(colors::IPV4_PREFIX);
            let result: ColoredString = format!("{address}/{prefix}").color(colors::SEPARATOR);
            ("IPv4".to_string(), result)
        })
        .collect()
}

pub fn print_interface(interface: &NetworkInterface, idx: usize) {
    print::tree_head(idx, &interface.name);
    let mut key_value_pair: Vec<Detail> = to_key_value_pair_net(&interface.get_ipv4_nets());
    if let Some(mac_addr) = interface.mac {
        key_value_pair.push((
            "MAC".to_string(),
            mac_addr.to_string().to_uppercase().color(colors::MAC_ADDR),
        ));
    }
    if let Some(subnet) = interface
        .get_ipv4_range()
        .and_then(|net| Subnet::new(net.network(), net.prefix()).ok())
    {
        key_value_pair.push(("Target".to_string(), subnet.to_string().color(colors::ACCENT)));
    }
    print::as_tree_one_level(key_value_pair);
}

pub fn record_details(record: &HostRecord) -> Vec<Detail> {
    let ports: ColoredString = if record.open_ports.is_empty() {
        record.open_ports_string().color(colors::PORT_NONE)
    } else {
        record.open_ports_string().color(colors::PORT_OPEN)
    };

    let mut details: Vec<Detail> = vec![
        ("MAC".to_string(), record.mac_string().color(colors::MAC_ADDR)),
        ("Vendor".to_string(), record.vendor.as_str().color(colors::VENDOR)),
        ("Ports".to_string(), ports),
    ];
    if !record.probe_complete {
        details.push(("Probe".to_string(), "incomplete".color(colors::INCOMPLETE)));
    }
    details
}

pub fn print_host(record: &HostRecord, idx: usize) {
    print::tree_head(idx, &record.ip.to_string());
    print::as_tree_one_level(record_details(record));
}
