//! Literal run-through scenarios for the scan engine, driven entirely
//! through the public API with a shared fake clock so elapsed time and
//! send/retry counts are exact rather than approximate.

use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use rawip_scan_engine::adapter::null::NullAdapter;
use rawip_scan_engine::engine::{Engine, EngineConfig};
use rawip_scan_engine::host_table::HostTable;
use rawip_scan_engine::resolver::fake::FakeResolver;
use rawip_scan_engine::socket::fake::FakeSocket;
use rawip_scan_engine::time::fake::FakeClock;
use rawip_scan_engine::time::Clock;
use rawip_scan_engine::{targets, Args, ScanError};

fn cfg(retry: u32, timeout_us: u64, interval_us: u64, backoff: f64) -> EngineConfig {
    EngineConfig {
        retry,
        initial_timeout_us: timeout_us,
        min_interval_us: interval_us,
        backoff_factor: backoff,
        source_port: 0,
        dest_port: 1434,
        local_data: None,
        verbose: 0,
        debug: 0,
    }
}

/// Scenario A: a single host that replies almost immediately. The engine
/// should send once, match the reply, and exit well before its timeout.
#[test]
fn single_host_immediate_reply() {
    let clock = Rc::new(FakeClock::new());
    let start = clock.now();
    let socket = Rc::new(FakeSocket::new(clock.clone()));
    socket.queue_reply_at(start + Duration::from_millis(5), Ipv4Addr::new(10, 0, 0, 1), vec![1, 2, 3]);

    let mut table = HostTable::new();
    table.add_host(Ipv4Addr::new(10, 0, 0, 1), 500_000);

    let mut engine = Engine::new(
        table,
        cfg(3, 500_000, 75_000, 1.5),
        Box::new(socket.clone()),
        Box::new(NullAdapter),
        Box::new(clock.clone()),
    );
    let stats = engine.run().unwrap();

    assert_eq!(stats.num_hosts, 1);
    assert_eq!(stats.responders, 1);
    assert_eq!(socket.sent.borrow().len(), 1);
    assert_eq!(stats.elapsed, Duration::from_millis(5));
}

/// Scenario B: a single host that never replies. Three attempts with
/// 1.5x backoff go out at t=0, 500ms, 1250ms; the host is retired once
/// its third (backed-off) timeout elapses.
#[test]
fn single_host_no_reply_retries_and_backs_off() {
    let clock = Rc::new(FakeClock::new());
    let start = clock.now();
    let socket = Rc::new(FakeSocket::new(clock.clone()));

    let mut table = HostTable::new();
    let idx = table.add_host(Ipv4Addr::new(10, 0, 0, 1), 500_000);

    let mut engine = Engine::new(
        table,
        cfg(3, 500_000, 75_000, 1.5),
        Box::new(socket.clone()),
        Box::new(NullAdapter),
        Box::new(clock.clone()),
    );
    let stats = engine.run().unwrap();

    assert_eq!(stats.responders, 0);
    assert_eq!(socket.sent.borrow().len(), 3);

    let entry = engine.table().get(idx);
    assert_eq!(entry.num_sent, 3);
    assert!(!entry.live);
    let last_send_offset = rawip_scan_engine::time::micros_between(entry.last_send_time.unwrap(), start);
    assert_eq!(last_send_offset, 1_250_000);
    assert_eq!(stats.elapsed, Duration::from_micros(2_450_000));
}

/// Scenario C: three hosts, each sent round-robin 100ms apart, neither
/// replying; each gets exactly `retry` attempts before being retired.
#[test]
fn three_hosts_round_robin_pacing_with_no_replies() {
    let clock = Rc::new(FakeClock::new());
    let socket = Rc::new(FakeSocket::new(clock.clone()));

    let mut table = HostTable::new();
    let a = table.add_host(Ipv4Addr::new(10, 0, 0, 1), 300_000);
    let b = table.add_host(Ipv4Addr::new(10, 0, 0, 2), 300_000);
    let c = table.add_host(Ipv4Addr::new(10, 0, 0, 3), 300_000);

    let mut engine = Engine::new(
        table,
        cfg(2, 300_000, 100_000, 1.0),
        Box::new(socket.clone()),
        Box::new(NullAdapter),
        Box::new(clock.clone()),
    );
    let stats = engine.run().unwrap();

    assert_eq!(stats.responders, 0);
    assert_eq!(socket.sent.borrow().len(), 6);
    for idx in [a, b, c] {
        let entry = engine.table().get(idx);
        assert_eq!(entry.num_sent, 2);
        assert!(!entry.live);
    }
    assert_eq!(stats.elapsed, Duration::from_millis(900));
}

/// Scenario D: a reply arrives from an address that was never probed.
/// It must be logged and ignored rather than matched to the one host
/// actually in flight, which still times out on its own schedule.
#[test]
fn reply_from_unknown_source_is_ignored() {
    let clock = Rc::new(FakeClock::new());
    let start = clock.now();
    let socket = Rc::new(FakeSocket::new(clock.clone()));
    socket.queue_reply_at(start + Duration::from_millis(10), Ipv4Addr::new(10, 0, 0, 99), vec![0]);

    let mut table = HostTable::new();
    let idx = table.add_host(Ipv4Addr::new(10, 0, 0, 1), 300_000);

    let mut engine = Engine::new(
        table,
        cfg(1, 300_000, 75_000, 1.0),
        Box::new(socket.clone()),
        Box::new(NullAdapter),
        Box::new(clock.clone()),
    );
    let stats = engine.run().unwrap();

    assert_eq!(stats.responders, 0);
    assert_eq!(socket.sent.borrow().len(), 1);
    let entry = engine.table().get(idx);
    assert_eq!(entry.num_sent, 1);
    assert_eq!(entry.num_recv, 0);
    assert!(!entry.live);
    assert_eq!(stats.elapsed, Duration::from_micros(375_000));
}

/// Scenario E: targets loaded from a file (one per line, first
/// whitespace-delimited token, blank lines ignored) preserve the file's
/// order as insertion order.
#[test]
fn targets_from_file_preserve_order_and_skip_blank_lines() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("rawip-scan-engine-test-targets-{}.txt", std::process::id()));
    std::fs::write(&path, "10.0.0.3 comment here\n\n10.0.0.1\n   \n10.0.0.2\n").unwrap();

    let args = Args::try_parse_from_for_test(&path);
    let resolver = FakeResolver::new();
    let mut table = HostTable::new();
    let mut adapter = NullAdapter;
    targets::populate(&mut table, &args, &resolver, &mut adapter).unwrap();

    std::fs::remove_file(&path).ok();

    let ordinals: Vec<Ipv4Addr> = table.iter_in_order().map(|e| e.addr).collect();
    assert_eq!(
        ordinals,
        vec![
            Ipv4Addr::new(10, 0, 0, 3),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        ]
    );
}

/// Scenario F: no positional hosts and no `--file` is a usage error
/// before the engine is ever constructed.
#[test]
fn no_hosts_and_no_file_is_a_usage_error() {
    let args = Args::try_parse_from(["rawip-scan-engine"]).unwrap();
    assert!(!args.has_targets());

    let resolver = FakeResolver::new();
    let mut table = HostTable::new();
    let mut adapter = NullAdapter;
    let err = targets::populate(&mut table, &args, &resolver, &mut adapter).unwrap_err();
    assert!(matches!(err, ScanError::EmptyHostList));
}

trait TestArgsExt {
    fn try_parse_from_for_test(path: &std::path::Path) -> Args;
}

impl TestArgsExt for Args {
    fn try_parse_from_for_test(path: &std::path::Path) -> Args {
        Args::try_parse_from([
            "rawip-scan-engine",
            "--file",
            path.to_str().expect("test path is valid utf-8"),
        ])
        .expect("fixed set of test args always parses")
    }
}
