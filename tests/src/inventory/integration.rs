use std::fs;
use std::net::{Ipv4Addr, TcpListener};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pnet::util::MacAddr;

use quietmap_common::config::VendorConfig;
use quietmap_common::error::{ScanError, TransportError};
use quietmap_common::network::ports::PortList;
use quietmap_common::network::range::Subnet;
use quietmap_common::scanning::StopSignal;
use quietmap_core::inventory::{InventoryService, ScanPhase};
use quietmap_core::prober::{PortProber, ProbePolicy};
use quietmap_core::report::CsvReportSink;
use quietmap_core::timing::ScanBudget;
use quietmap_core::vendors::{OuiTable, OuiVendorRepo};

use crate::utils::{FakeLan, FakeLanScanner, TableConnector, mac};

const IEEE_SAMPLE: &str = "\
Registry,Assignment,Organization Name,Organization Address
MA-L,001A2B,\"Acme, Inc.\",1 Example Way
";

fn quick_policy() -> ProbePolicy {
    ProbePolicy {
        per_attempt_timeout: Duration::from_millis(500),
        inter_attempt_delay: Duration::from_millis(10),
    }
}

fn service(
    lan: FakeLan,
    own_ip: Ipv4Addr,
    vendors: OuiVendorRepo,
    prober: PortProber,
) -> InventoryService {
    InventoryService::new(
        Box::new(FakeLanScanner { lan, own_ip }),
        Arc::new(vendors),
        prober,
    )
    .with_discovery_window(Duration::from_millis(200))
}

fn report_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn unreachable_registry(cache_path: &Path) -> VendorConfig {
    VendorConfig {
        refresh: true,
        source_url: "http://127.0.0.1:9/oui.csv".to_string(),
        cache_path: cache_path.to_path_buf(),
        max_age: Duration::from_secs(60),
        fetch_timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn single_host_inventory_with_failed_vendor_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("network_inventory.csv");
    let host = Ipv4Addr::new(192, 168, 1, 10);

    let vendors = OuiVendorRepo::empty()
        .load_refreshed(&unreachable_registry(&dir.path().join("oui.csv")))
        .await;
    assert!(!vendors.has_dataset());

    let connector = TableConnector::default().open(host, &[22, 80]);
    let mut service = service(
        FakeLan::new().host(host, MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff)),
        Ipv4Addr::new(192, 168, 1, 1),
        vendors,
        PortProber::new(Arc::new(connector), quick_policy()),
    );
    let ports: PortList = "21,22,23,80,443".parse().unwrap();
    let mut sink = CsvReportSink::new(&output);

    let subnet: Subnet = "192.168.1.0/24".parse().unwrap();
    let outcome = service.run(&subnet, &ports, &mut sink).await.unwrap();

    assert_eq!(outcome.hosts_recorded, 1);
    assert!(!outcome.partial);
    assert_eq!(service.phase(), ScanPhase::Done);
    assert_eq!(
        report_lines(&output),
        vec![
            "IP,MAC,Vendor,Open Ports".to_string(),
            r#"192.168.1.10,AA:BB:CC:DD:EE:FF,Unknown,"22, 80""#.to_string(),
        ]
    );
}

#[tokio::test]
async fn vendors_come_from_the_ieee_table() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("inventory.csv");
    let table = OuiTable::parse(IEEE_SAMPLE.as_bytes()).unwrap();

    let mut service = service(
        FakeLan::new()
            .host(Ipv4Addr::new(10, 1, 0, 3), mac(3))
            .host(Ipv4Addr::new(10, 1, 0, 9), MacAddr::new(0x02, 0, 0, 0, 0, 9)),
        Ipv4Addr::new(10, 1, 0, 1),
        OuiVendorRepo::empty().with_table(table),
        PortProber::new(Arc::new(TableConnector::default()), quick_policy()),
    );
    let mut sink = CsvReportSink::new(&output);

    let subnet: Subnet = "10.1.0.0/28".parse().unwrap();
    let ports: PortList = "443".parse().unwrap();
    service.run(&subnet, &ports, &mut sink).await.unwrap();

    assert_eq!(
        report_lines(&output)[1..],
        [
            r#"10.1.0.3,00:1A:2B:00:00:03,"Acme, Inc.",None"#.to_string(),
            "10.1.0.9,02:00:00:00:00:09,Unknown,None".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn empty_network_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("inventory.csv");
    let mut service = service(
        FakeLan::new(),
        Ipv4Addr::new(192, 168, 1, 1),
        OuiVendorRepo::empty(),
        PortProber::new(Arc::new(TableConnector::default()), quick_policy()),
    );

    let subnet: Subnet = "192.168.1.0/24".parse().unwrap();
    let outcome = service
        .run(&subnet, &PortList::default(), &mut CsvReportSink::new(&output))
        .await
        .unwrap();

    assert_eq!(outcome.hosts_recorded, 0);
    assert_eq!(report_lines(&output), vec!["IP,MAC,Vendor,Open Ports".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn link_failure_leaves_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("inventory.csv");
    let mut service = service(
        FakeLan::new().host(Ipv4Addr::new(192, 168, 1, 10), mac(10)).broken(),
        Ipv4Addr::new(192, 168, 1, 1),
        OuiVendorRepo::empty(),
        PortProber::new(Arc::new(TableConnector::default()), quick_policy()),
    );

    let subnet: Subnet = "192.168.1.0/24".parse().unwrap();
    let err = service
        .run(&subnet, &PortList::default(), &mut CsvReportSink::new(&output))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Transport(TransportError::Send(_))));
    assert_eq!(service.phase(), ScanPhase::Failed);
    assert!(!output.exists());
}

#[tokio::test(start_paused = true)]
async fn expired_deadline_still_reports_every_host() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("inventory.csv");
    let hosts = [3u8, 4, 5];
    let lan = hosts.iter().fold(FakeLan::new(), |lan, &last| {
        lan.host(Ipv4Addr::new(172, 16, 0, last), mac(last))
    });

    let policy = ProbePolicy {
        per_attempt_timeout: Duration::from_millis(500),
        inter_attempt_delay: Duration::from_millis(300),
    };
    let budget = ScanBudget::starting_now(Some(Duration::from_secs(1)), StopSignal::new());
    let mut service = service(
        lan,
        Ipv4Addr::new(172, 16, 0, 1),
        OuiVendorRepo::empty(),
        PortProber::new(Arc::new(TableConnector::default().filtered()), policy),
    )
    .with_budget(budget);

    let subnet: Subnet = "172.16.0.0/24".parse().unwrap();
    let ports: PortList = "21,22,23,80,443".parse().unwrap();
    let outcome = service
        .run(&subnet, &ports, &mut CsvReportSink::new(&output))
        .await
        .unwrap();

    assert!(outcome.partial);
    assert_eq!(outcome.hosts_recorded, hosts.len());
    let lines = report_lines(&output);
    assert_eq!(lines.len(), hosts.len() + 1);
    assert!(lines[1].starts_with("172.16.0.3,"));
}

#[tokio::test(start_paused = true)]
async fn deadline_shorter_than_the_window_bounds_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("inventory.csv");
    let budget = ScanBudget::starting_now(Some(Duration::from_secs(1)), StopSignal::new());
    let mut service = service(
        FakeLan::new(),
        Ipv4Addr::new(192, 168, 1, 1),
        OuiVendorRepo::empty(),
        PortProber::new(Arc::new(TableConnector::default()), quick_policy()),
    )
    .with_discovery_window(Duration::from_secs(30))
    .with_budget(budget);

    let start = tokio::time::Instant::now();
    let subnet: Subnet = "192.168.1.0/24".parse().unwrap();
    let outcome = service
        .run(&subnet, &PortList::default(), &mut CsvReportSink::new(&output))
        .await
        .unwrap();

    assert!(start.elapsed() <= Duration::from_secs(2), "ran for {:?}", start.elapsed());
    assert!(outcome.partial);
    assert_eq!(outcome.hosts_recorded, 0);
    assert_eq!(report_lines(&output), vec!["IP,MAC,Vendor,Open Ports".to_string()]);
}

#[tokio::test]
async fn real_handshakes_against_loopback_listeners() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("inventory.csv");

    let first = TcpListener::bind("127.0.0.1:0").unwrap();
    let second = TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_port = {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let first_port = first.local_addr().unwrap().port();
    let second_port = second.local_addr().unwrap().port();

    let ports = PortList::new(vec![second_port, closed_port, first_port]).unwrap();
    let mut service = service(
        FakeLan::new().host(Ipv4Addr::new(127, 0, 0, 1), mac(1)),
        Ipv4Addr::new(127, 0, 0, 6),
        OuiVendorRepo::empty(),
        PortProber::tcp(quick_policy()),
    );

    let subnet: Subnet = "127.0.0.0/29".parse().unwrap();
    let outcome = service
        .run(&subnet, &ports, &mut CsvReportSink::new(&output))
        .await
        .unwrap();

    assert_eq!(outcome.hosts_recorded, 1);
    let expected = format!(
        r#"127.0.0.1,00:1A:2B:00:00:01,Unknown,"{second_port}, {first_port}""#
    );
    assert_eq!(report_lines(&output)[1], expected);
}
