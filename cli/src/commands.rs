pub mod interfaces;
pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use quietmap_common::config::{
    self, Config, DEFAULT_HOST_CONCURRENCY, DEFAULT_OUI_URL, DEFAULT_OUTPUT_FILE, OutputConfig,
    ScanConfig, VendorConfig,
};
use quietmap_common::network::ports::PortList;
use quietmap_common::network::target::{DEFAULT_SUBNET, Target};

#[derive(Parser)]
#[command(name = "quietmap", version)]
#[command(about = "A quiet LAN inventory scanner.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Print less; repeat to print only the summary
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Skip the start-up banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List local interfaces that can be scanned
    #[command(alias = "i")]
    Interfaces,
    /// Inventory a subnet: discover hosts, resolve vendors, probe ports
    #[command(alias = "s")]
    Scan(ScanArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Subnet in CIDR notation, or "lan" for the local network
    #[arg(default_value = DEFAULT_SUBNET)]
    pub target: Target,

    /// Comma separated TCP ports, probed in this order
    #[arg(short, long, default_value_t = PortList::default())]
    pub ports: PortList,

    /// CSV report path
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Seconds to collect ARP replies after the sweep
    #[arg(short, long, value_name = "SECS", default_value = "2", value_parser = config::parse_secs)]
    pub window: Duration,

    /// Seconds to wait for each TCP handshake
    #[arg(short, long, value_name = "SECS", default_value = "0.5", value_parser = config::parse_secs)]
    pub timeout: Duration,

    /// Seconds to pause between two probes of the same host
    #[arg(short, long, value_name = "SECS", default_value = "0.3", value_parser = config::parse_secs)]
    pub delay: Duration,

    /// Hosts probed at the same time
    #[arg(short = 'j', long, default_value_t = DEFAULT_HOST_CONCURRENCY)]
    pub parallel: usize,

    /// Limit the whole run to this many seconds and report what was found
    #[arg(long, value_name = "SECS", value_parser = config::parse_secs)]
    pub deadline: Option<Duration>,

    /// Do not download the IEEE vendor registry
    #[arg(long)]
    pub no_refresh: bool,

    /// Where the downloaded vendor registry is cached
    #[arg(long, value_name = "PATH")]
    pub oui_cache: Option<PathBuf>,

    /// Vendor registry download URL
    #[arg(long, value_name = "URL", default_value = DEFAULT_OUI_URL)]
    pub oui_url: String,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            quiet: self.quiet,
            no_banner: self.no_banner,
            ..OutputConfig::default()
        }
    }
}

impl ScanArgs {
    pub fn into_config(self, output: OutputConfig) -> Config {
        let vendor_defaults = VendorConfig::default();
        Config {
            scan: ScanConfig {
                target: self.target,
                ports: self.ports,
                discovery_window: self.window,
                per_attempt_timeout: self.timeout,
                inter_attempt_delay: self.delay,
                host_concurrency: self.parallel,
                deadline: self.deadline,
            },
            vendor: VendorConfig {
                refresh: !self.no_refresh,
                source_url: self.oui_url,
                cache_path: self.oui_cache.unwrap_or(vendor_defaults.cache_path),
                ..vendor_defaults
            },
            output: OutputConfig {
                output_file: self.output,
                ..output
            },
        }
    }
}
