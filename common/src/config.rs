//! Run configuration.
//!
//! Every tunable of a scan lives here and is passed explicitly into the
//! engine. Defaults reproduce a quiet sweep of a private /24.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::network::ports::PortList;
use crate::network::target::Target;

pub const DEFAULT_OUTPUT_FILE: &str = "network_inventory.csv";
pub const DEFAULT_DISCOVERY_WINDOW: Duration = Duration::from_secs(2);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_ATTEMPT_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_HOST_CONCURRENCY: usize = 1;

pub const DEFAULT_OUI_URL: &str = "https://standards-oui.ieee.org/oui/oui.csv";
pub const DEFAULT_OUI_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_OUI_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub scan: ScanConfig,
    pub vendor: VendorConfig,
    pub output: OutputConfig,
}

/// What to sweep and how gently.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: Target,
    pub ports: PortList,
    /// How long ARP replies are collected after the sweep.
    pub discovery_window: Duration,
    /// Upper bound on a single TCP handshake.
    pub per_attempt_timeout: Duration,
    /// Pause between two attempts against the same host.
    pub inter_attempt_delay: Duration,
    /// Hosts probed at the same time. Ports of one host are always serial.
    pub host_concurrency: usize,
    /// Overall limit for the whole run. Hosts found before it expires are
    /// still reported.
    pub deadline: Option<Duration>,
}

/// Where vendor names come from.
#[derive(Debug, Clone)]
pub struct VendorConfig {
    /// Try to refresh the IEEE dataset before scanning.
    pub refresh: bool,
    pub source_url: String,
    pub cache_path: PathBuf,
    /// A cache younger than this is used without downloading.
    pub max_age: Duration,
    pub fetch_timeout: Duration,
}

/// Report and terminal output.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_file: PathBuf,
    /// 0 prints everything, 1 hides decorations, 2 prints only the summary.
    pub quiet: u8,
    pub no_banner: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            ports: PortList::default(),
            discovery_window: DEFAULT_DISCOVERY_WINDOW,
            per_attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            inter_attempt_delay: DEFAULT_ATTEMPT_DELAY,
            host_concurrency: DEFAULT_HOST_CONCURRENCY,
            deadline: None,
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            refresh: true,
            source_url: DEFAULT_OUI_URL.to_string(),
            cache_path: default_cache_path(),
            max_age: DEFAULT_OUI_MAX_AGE,
            fetch_timeout: DEFAULT_OUI_TIMEOUT,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            quiet: 0,
            no_banner: false,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery_window.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "discovery_window",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.per_attempt_timeout.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "per_attempt_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(ConfigError::InvalidDuration {
                field: "deadline",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.host_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency {
                field: "host_concurrency",
            });
        }
        Ok(())
    }

    /// Worst case time spent probing one host.
    pub fn per_host_budget(&self) -> Duration {
        (self.per_attempt_timeout + self.inter_attempt_delay) * self.ports.len() as u32
    }
}

fn default_cache_path() -> PathBuf {
    std::env::temp_dir().join("quietmap-oui.csv")
}

/// Parses a duration given in (possibly fractional) seconds, e.g. "0.3".
pub fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("'{s}' is not a number of seconds: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{s}' is not a valid duration: {e}"))
}
