//! Paced TCP connect probing of a single host.
//!
//! Ports are tried one at a time, in list order, with a fixed pause between
//! attempts. Every failure counts as "closed"; the prober itself never fails.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use quietmap_common::config::ScanConfig;
use quietmap_common::error::ProbeError;
use quietmap_common::network::ports::PortList;

use crate::network::tcp::{self, Connector, TcpConnector};
use crate::timing::ScanBudget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub per_attempt_timeout: Duration,
    pub inter_attempt_delay: Duration,
}

impl From<&ScanConfig> for ProbePolicy {
    fn from(cfg: &ScanConfig) -> Self {
        Self {
            per_attempt_timeout: cfg.per_attempt_timeout,
            inter_attempt_delay: cfg.inter_attempt_delay,
        }
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

/// Outcome of probing one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// `(port, open)` for every attempted port, in probe order.
    pub outcomes: Vec<(u16, bool)>,
    /// False when the budget ran out before every port was attempted.
    pub complete: bool,
}

impl ProbeResult {
    pub fn open_ports(&self) -> Vec<u16> {
        self.outcomes
            .iter()
            .filter(|(_, open)| *open)
            .map(|(port, _)| *port)
            .collect()
    }
}

#[derive(Clone)]
pub struct PortProber {
    connector: Arc<dyn Connector>,
    policy: ProbePolicy,
}

impl PortProber {
    pub fn new(connector: Arc<dyn Connector>, policy: ProbePolicy) -> Self {
        Self { connector, policy }
    }

    /// A prober using real TCP connections.
    pub fn tcp(policy: ProbePolicy) -> Self {
        Self::new(Arc::new(TcpConnector), policy)
    }

    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    pub async fn probe(&self, host: Ipv4Addr, ports: &PortList, budget: &ScanBudget) -> ProbeResult {
        let mut outcomes: Vec<(u16, bool)> = Vec::with_capacity(ports.len());
        let last = ports.len().saturating_sub(1);

        for (idx, port) in ports.iter().enumerate() {
            let addr = SocketAddr::from((host, port));

            match self.attempt(addr, budget).await {
                Ok(()) => {
                    debug!("{addr} is open");
                    outcomes.push((port, true));
                }
                Err(ProbeError::Cancelled { .. }) => {
                    debug!("Probing of {host} cut short after {} port(s)", outcomes.len());
                    return ProbeResult { outcomes, complete: false };
                }
                Err(e) => {
                    debug!("{e}");
                    outcomes.push((port, false));
                }
            }

            if idx < last && !budget.pause(self.policy.inter_attempt_delay).await {
                return ProbeResult { outcomes, complete: false };
            }
        }

        ProbeResult { outcomes, complete: true }
    }

    async fn attempt(&self, addr: SocketAddr, budget: &ScanBudget) -> Result<(), ProbeError> {
        if budget.is_exhausted() {
            return Err(ProbeError::Cancelled { addr });
        }

        let limit = budget.cap(self.policy.per_attempt_timeout);
        let outcome = tokio::select! {
            outcome = tcp::handshake_probe(self.connector.as_ref(), addr, limit) => outcome,
            _ = budget.exhausted() => return Err(ProbeError::Cancelled { addr }),
        };

        // A timeout shortened by the deadline says nothing about the port.
        let truncated = limit < self.policy.per_attempt_timeout;
        if truncated && matches!(outcome, Err(ProbeError::Timeout { .. })) {
            return Err(ProbeError::Cancelled { addr });
        }
        outcome
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
