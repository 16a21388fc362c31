use pnet::datalink::NetworkInterface;

use quietmap_common::config::Config;
use quietmap_common::network::interface;

use crate::mprint;
use crate::terminal::{network_fmt, print};

pub fn interfaces(cfg: &Config) -> anyhow::Result<()> {
    let quiet = cfg.output.quiet;
    let interfaces: Vec<NetworkInterface> = interface::get_lan_interfaces();

    if interfaces.is_empty() {
        print::header("no usable interfaces", quiet);
        print::no_results(quiet);
        return Ok(());
    }

    print::header("lan interfaces", quiet);
    for (idx, intf) in interfaces.iter().enumerate() {
        network_fmt::print_interface(intf, idx);
        if idx + 1 != interfaces.len() {
            mprint!();
        }
    }
    print::end_of_program(quiet);
    Ok(())
}
