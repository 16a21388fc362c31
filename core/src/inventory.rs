//! # Network Inventory Service
//!
//! Implements the end-to-end "inventory a subnet" use case:
//!
//! 1. **Discovering**: delegate the link-layer sweep to a [`NetworkScanner`].
//! 2. **Enriching**: resolve each host's vendor and probe its ports.
//! 3. **Reporting**: hand the finished records to a [`ReportSink`].
//!
//! A transport failure ends the run before anything is written. Lookup and
//! probe failures never do; they degrade to "Unknown" and "closed".

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use quietmap_common::UNKNOWN_VENDOR;
use quietmap_common::config::{DEFAULT_DISCOVERY_WINDOW, DEFAULT_HOST_CONCURRENCY};
use quietmap_common::error::ScanError;
use quietmap_common::network::host::{DiscoveryReply, HostRecord};
use quietmap_common::network::ports::PortList;
use quietmap_common::network::range::Subnet;
use quietmap_common::scanning::NetworkScanner;
use quietmap_common::vendors::VendorRepository;

use crate::prober::PortProber;
use crate::report::ReportSink;
use crate::timing::ScanBudget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Discovering,
    Enriching,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Discovering => "discovering",
            ScanPhase::Enriching => "enriching",
            ScanPhase::Reporting => "reporting",
            ScanPhase::Done => "done",
            ScanPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub hosts_recorded: usize,
    /// The deadline or stop signal cut the run short. Every discovered host
    /// was still recorded.
    pub partial: bool,
}

/// Called with every record as soon as it is assembled.
pub type HostObserver = Arc<dyn Fn(&HostRecord) + Send + Sync>;

pub struct InventoryService {
    scanner: Box<dyn NetworkScanner>,
    vendor_repo: Arc<dyn VendorRepository>,
    prober: PortProber,
    discovery_window: Duration,
    host_concurrency: usize,
    budget: ScanBudget,
    on_host: Option<HostObserver>,
    phase: ScanPhase,
}

impl InventoryService {
    pub fn new(
        scanner: Box<dyn NetworkScanner>,
        vendor_repo: Arc<dyn VendorRepository>,
        prober: PortProber,
    ) -> Self {
        Self {
            scanner,
            vendor_repo,
            prober,
            discovery_window: DEFAULT_DISCOVERY_WINDOW,
            host_concurrency: DEFAULT_HOST_CONCURRENCY,
            budget: ScanBudget::unlimited(),
            on_host: None,
            phase: ScanPhase::Idle,
        }
    }

    pub fn with_discovery_window(mut self, window: Duration) -> Self {
        self.discovery_window = window;
        self
    }

    /// Hosts probed at once. Values below 1 are treated as 1.
    pub fn with_host_concurrency(mut self, host_concurrency: usize) -> Self {
        self.host_concurrency = host_concurrency.max(1);
        self
    }

    pub fn with_budget(mut self, budget: ScanBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn on_host(mut self, observer: HostObserver) -> Self {
        self.on_host = Some(observer);
        self
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Inventories `subnet` and writes the result to `sink`.
    pub async fn run(
        &mut self,
        subnet: &Subnet,
        ports: &PortList,
        sink: &mut dyn ReportSink,
    ) -> Result<ScanOutcome, ScanError> {
        self.transition(ScanPhase::Discovering);
        let window = self.budget.cap(self.discovery_window);
        let replies = match self
            .scanner
            .discover(subnet, window, self.budget.stop_signal())
            .await
        {
            Ok(replies) => replies,
            Err(e) => {
                self.transition(ScanPhase::Failed);
                return Err(e.into());
            }
        };
        let discovery_cut_short = self.budget.is_exhausted();
        if discovery_cut_short {
            warn!("Discovery was cut short; late replies were not collected");
        }
        info!("Discovered {} host(s) on {subnet}", replies.len());

        self.transition(ScanPhase::Enriching);
        let records = self.enrich(replies, ports).await;
        let partial = discovery_cut_short || records.iter().any(|r| !r.probe_complete);

        self.transition(ScanPhase::Reporting);
        let hosts_recorded = match sink.write(&records) {
            Ok(written) => written,
            Err(e) => {
                self.transition(ScanPhase::Failed);
                return Err(e.into());
            }
        };

        self.transition(ScanPhase::Done);
        Ok(ScanOutcome {
            hosts_recorded,
            partial,
        })
    }

    async fn enrich(&self, replies: Vec<DiscoveryReply>, ports: &PortList) -> Vec<HostRecord> {
        let semaphore = Arc::new(Semaphore::new(self.host_concurrency));
        let ports = Arc::new(ports.clone());
        let mut tasks: JoinSet<(usize, HostRecord)> = JoinSet::new();
        let mut task_slots: HashMap<tokio::task::Id, usize> = HashMap::new();
        let mut slots: Vec<Option<HostRecord>> = vec![None; replies.len()];
        let vendors: Vec<String> = replies
            .iter()
            .map(|reply| resolve_vendor(self.vendor_repo.as_ref(), reply))
            .collect();

        for (idx, reply) in replies.iter().copied().enumerate() {
            // Taking the permit here, not in the task, keeps hosts starting in
            // discovery order.
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let vendor = vendors[idx].clone();
            let prober = self.prober.clone();
            let ports = Arc::clone(&ports);
            let budget = self.budget.clone();
            let observer = self.on_host.clone();

            let handle = tasks.spawn(async move {
                let _permit = permit;
                let record = enrich_host(reply, vendor, &prober, &ports, &budget).await;
                if let Some(observer) = observer {
                    observer(&record);
                }
                (idx, record)
            });
            task_slots.insert(handle.id(), idx);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, record)) => slots[idx] = Some(record),
                Err(e) => {
                    let Some(&idx) = task_slots.get(&e.id()) else {
                        continue;
                    };
                    warn!("Enrichment of {} failed: {e}", replies[idx].ip);
                    let record = best_effort_record(replies[idx], &vendors[idx]);
                    if let Some(observer) = &self.on_host {
                        observer(&record);
                    }
                    slots[idx] = Some(record);
                }
            }
        }

        slots
            .into_iter()
            .zip(replies.into_iter().zip(&vendors))
            .map(|(slot, (reply, vendor))| slot.unwrap_or_else(|| best_effort_record(reply, vendor)))
            .collect()
    }

    fn transition(&mut self, next: ScanPhase) {
        debug!("Scan phase: {} -> {next}", self.phase);
        self.phase = next;
    }
}

fn resolve_vendor(vendor_repo: &dyn VendorRepository, reply: &DiscoveryReply) -> String {
    vendor_repo.get_vendor(reply.mac).unwrap_or_else(|e| {
        debug!("Vendor lookup for {}: {e}", reply.mac);
        UNKNOWN_VENDOR.to_string()
    })
}

async fn enrich_host(
    reply: DiscoveryReply,
    vendor: String,
    prober: &PortProber,
    ports: &PortList,
    budget: &ScanBudget,
) -> HostRecord {
    let result = prober.probe(reply.ip, ports, budget).await;

    HostRecord::new(reply)
        .with_vendor(vendor)
        .with_open_ports(result.open_ports(), result.complete)
}

/// What is known about a host whose probe never finished.
fn best_effort_record(reply: DiscoveryReply, vendor: &str) -> HostRecord {
    HostRecord::new(reply)
        .with_vendor(vendor)
        .with_open_ports(Vec::new(), false)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
