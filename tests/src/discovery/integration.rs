use std::net::Ipv4Addr;
use std::time::Duration;

use pnet::util::MacAddr;
use tokio::time::Instant;

use quietmap_common::error::TransportError;
use quietmap_common::network::range::Subnet;
use quietmap_common::scanning::{NetworkScanner, StopSignal};

use crate::utils::{FakeLan, FakeLanScanner, mac};

const WINDOW: Duration = Duration::from_secs(2);

fn lan_24() -> Subnet {
    "192.168.1.0/24".parse().unwrap()
}

fn own_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, 1)
}

fn scanner(lan: FakeLan) -> FakeLanScanner {
    FakeLanScanner { lan, own_ip: own_ip() }
}

#[tokio::test(start_paused = true)]
async fn silent_network_returns_nothing_after_the_window() {
    let start = Instant::now();
    let replies = scanner(FakeLan::new())
        .discover(&lan_24(), WINDOW, &StopSignal::new())
        .await
        .unwrap();

    assert!(replies.is_empty());
    let elapsed = start.elapsed();
    assert!(elapsed >= WINDOW, "returned after {elapsed:?}");
    assert!(elapsed < WINDOW + Duration::from_millis(200), "returned after {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn answering_hosts_are_found() {
    let lan = FakeLan::new()
        .host(Ipv4Addr::new(192, 168, 1, 10), mac(10))
        .host(Ipv4Addr::new(192, 168, 1, 200), mac(200));

    let replies = scanner(lan).discover(&lan_24(), WINDOW, &StopSignal::new()).await.unwrap();

    let found: Vec<(Ipv4Addr, MacAddr)> = replies.iter().map(|r| (r.ip, r.mac)).collect();
    assert_eq!(
        found,
        vec![
            (Ipv4Addr::new(192, 168, 1, 10), mac(10)),
            (Ipv4Addr::new(192, 168, 1, 200), mac(200)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_and_conflicting_replies_yield_one_entry_per_host() {
    let ip = Ipv4Addr::new(192, 168, 1, 10);
    let lan = FakeLan::new()
        .host(ip, mac(10))
        .host(ip, mac(11))
        // Same MAC answering for a second address.
        .host(Ipv4Addr::new(192, 168, 1, 20), mac(10))
        .chatty(3);

    let replies = scanner(lan).discover(&lan_24(), WINDOW, &StopSignal::new()).await.unwrap();

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].ip, ip);
    assert_eq!(replies[0].mac, mac(10));
}

#[tokio::test(start_paused = true)]
async fn own_address_is_never_reported() {
    let lan = FakeLan::new().host(own_ip(), mac(1));

    let replies = scanner(lan).discover(&lan_24(), WINDOW, &StopSignal::new()).await.unwrap();

    assert!(replies.is_empty());
}

#[tokio::test(start_paused = true)]
async fn fully_answered_subnet_returns_before_the_window() {
    let subnet: Subnet = "10.0.0.0/30".parse().unwrap();
    let lan = FakeLan::new().host(Ipv4Addr::new(10, 0, 0, 2), mac(2));
    let scanner = FakeLanScanner { lan, own_ip: Ipv4Addr::new(10, 0, 0, 1) };

    let start = Instant::now();
    let replies = scanner.discover(&subnet, WINDOW, &StopSignal::new()).await.unwrap();

    assert_eq!(replies.len(), 1);
    assert!(start.elapsed() < WINDOW);
}

#[tokio::test(start_paused = true)]
async fn stop_signal_ends_listening_early() {
    let stop = StopSignal::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.stop();
    });

    let start = Instant::now();
    let replies = scanner(FakeLan::new().host(Ipv4Addr::new(192, 168, 1, 7), mac(7)))
        .discover(&lan_24(), Duration::from_secs(30), &stop)
        .await
        .unwrap();

    assert_eq!(replies.len(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn send_failure_is_a_transport_error() {
    let result = scanner(FakeLan::new().broken())
        .discover(&lan_24(), WINDOW, &StopSignal::new())
        .await;

    assert!(matches!(result, Err(TransportError::Send(_))));
}
