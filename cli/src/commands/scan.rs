use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use tracing::{Instrument, info_span, warn};

use quietmap_common::config::{Config, ScanConfig, VendorConfig};
use quietmap_common::error::{ScanError, TransportError};
use quietmap_common::network::host::HostRecord;
use quietmap_common::network::range::Subnet;
use quietmap_common::network::target;
use quietmap_common::scanning::StopSignal;
use quietmap_core::inventory::{HostObserver, InventoryService, ScanOutcome};
use quietmap_core::prober::{PortProber, ProbePolicy};
use quietmap_core::report::CsvReportSink;
use quietmap_core::scanner::ArpScanner;
use quietmap_core::timing::ScanBudget;
use quietmap_core::vendors::OuiVendorRepo;

use crate::mprint;
use crate::terminal::{colors, network_fmt, print, spinner};

const SETTINGS_KEY_WIDTH: usize = 8;

pub async fn scan(cfg: &Config) -> anyhow::Result<()> {
    cfg.scan.validate()?;
    let quiet = cfg.output.quiet;

    if !is_root::is_root() {
        warn!("Not running as root; opening a raw socket will probably be refused");
    }

    let subnet: Subnet = target::resolve(&cfg.scan.target)?;
    print_settings(&subnet, cfg);

    let stop = StopSignal::new();
    watch_ctrl_c(stop.clone());

    let start_time: Instant = Instant::now();
    let budget = ScanBudget::starting_now(cfg.scan.deadline, stop);

    let span = info_span!("inventory", indicatif.pb_show = true);
    spinner::attach(&span, "Preparing vendor data...");
    let vendor_cfg = VendorConfig {
        fetch_timeout: budget.cap(cfg.vendor.fetch_timeout),
        ..cfg.vendor.clone()
    };
    let vendor_repo = OuiVendorRepo::prepare(&vendor_cfg)
        .instrument(span.clone())
        .await;

    spinner::set_message(&span, &format!("Sweeping {subnet}..."));
    let mut service = InventoryService::new(
        Box::new(ArpScanner),
        Arc::new(vendor_repo),
        PortProber::tcp(ProbePolicy::from(&cfg.scan)),
    )
    .with_discovery_window(cfg.scan.discovery_window)
    .with_host_concurrency(cfg.scan.host_concurrency)
    .with_budget(budget)
    .on_host(host_printer(span.clone(), quiet));

    print::header("Inventory", quiet);

    let mut sink = CsvReportSink::new(&cfg.output.output_file);
    let result = service
        .run(&subnet, &cfg.scan.ports, &mut sink)
        .instrument(span.clone())
        .await;
    // The observer holds a clone of the span; both must go for the bar to clear.
    drop(service);
    drop(span);

    match result {
        Ok(outcome) => {
            scan_ends(outcome, start_time.elapsed(), cfg);
            Ok(())
        }
        Err(ScanError::Transport(e)) if e.is_permission_denied() => Err(e)
            .context("raw sockets need root or CAP_NET_RAW; try again with sudo"),
        Err(ScanError::Transport(e @ TransportError::NoInterface { .. })) => Err(e)
            .context("only directly attached subnets can be scanned; see `quietmap interfaces`"),
        Err(e) => Err(e.into()),
    }
}

fn print_settings(subnet: &Subnet, cfg: &Config) {
    if cfg.output.quiet > 0 {
        return;
    }
    print::header("Scan settings", cfg.output.quiet);
    let pacing = pacing_summary(&cfg.scan);
    print::aligned_line("Subnet", subnet.to_string().color(colors::IPV4_ADDR), SETTINGS_KEY_WIDTH);
    print::aligned_line("Ports", cfg.scan.ports.to_string(), SETTINGS_KEY_WIDTH);
    print::aligned_line("Pacing", pacing, SETTINGS_KEY_WIDTH);
    print::aligned_line(
        "Report",
        cfg.output.output_file.display().to_string(),
        SETTINGS_KEY_WIDTH,
    );
    if let Some(deadline) = cfg.scan.deadline {
        print::aligned_line(
            "Deadline",
            format!("{:.1}s", deadline.as_secs_f64()),
            SETTINGS_KEY_WIDTH,
        );
    }
}

fn pacing_summary(scan: &ScanConfig) -> String {
    format!(
        "{:.2}s timeout, {:.2}s between probes, at most {:.1}s per host",
        scan.per_attempt_timeout.as_secs_f64(),
        scan.inter_attempt_delay.as_secs_f64(),
        scan.per_host_budget().as_secs_f64()
    )
}

/// Prints each host as soon as it is inventoried.
fn host_printer(span: tracing::Span, quiet: u8) -> HostObserver {
    let count = Arc::new(AtomicUsize::new(0));
    Arc::new(move |record: &HostRecord| {
        let idx = count.fetch_add(1, Ordering::Relaxed);
        spinner::report_progress(&span, idx + 1);
        if quiet >= 2 {
            return;
        }
        if idx > 0 {
            mprint!();
        }
        network_fmt::print_host(record, idx);
    })
}

fn watch_ctrl_c(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stopping early; hosts found so far will still be reported");
            stop.stop();
        }
    });
}

fn scan_ends(outcome: ScanOutcome, total_time: Duration, cfg: &Config) {
    let quiet = cfg.output.quiet;
    if outcome.hosts_recorded == 0 {
        print::header("ZERO HOSTS DETECTED", quiet);
        print::no_results(quiet);
    }
    if outcome.partial {
        warn!("Scan was cut short; some hosts were not fully probed");
    }
    print_summary(outcome.hosts_recorded, total_time, cfg);
}

fn print_summary(hosts_len: usize, total_time: Duration, cfg: &Config) {
    let active_hosts: ColoredString = format!("{hosts_len} hosts").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let report: ColoredString = cfg.output.output_file.display().to_string().bold();
    let output: &ColoredString = &format!(
        "Inventory Complete: {active_hosts} recorded in {total_time} to {report}"
    )
    .color(colors::TEXT_DEFAULT);

    match cfg.output.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output.to_string());
        }
        _ => print::print_status(output.to_string()),
    }
}
