use clap::{CommandFactory, Parser};
use tracing::info;

use rawip_scan_engine::adapter::null::NullAdapter;
use rawip_scan_engine::adapter::ProtocolAdapter;
use rawip_scan_engine::args::Args;
use rawip_scan_engine::engine::{Engine, EngineConfig};
use rawip_scan_engine::host_table::HostTable;
use rawip_scan_engine::logging;
use rawip_scan_engine::report;
use rawip_scan_engine::resolver::DnsLookupResolver;
use rawip_scan_engine::socket::UdpRawSocket;
use rawip_scan_engine::targets;
use rawip_scan_engine::time::SystemClock;

fn main() {
    let args = Args::parse();

    // `--help`/`-h` and `--version`/`-V` are handled by hand (clap's own
    // flags are disabled in `Args`) so the protocol adapter gets a say in
    // what gets printed, the way the original's `usage()`/`udp_scan_version()`
    // call into `local_help()`/`local_version()`.
    if args.help {
        Args::command().print_help().ok();
        println!();
        if let Some(text) = NullAdapter.local_help() {
            println!("{text}");
        }
        std::process::exit(0);
    }
    if args.version {
        println!("{}", report::PACKAGE_STRING);
        if let Some(text) = NullAdapter.local_version() {
            println!("{text}");
        }
        std::process::exit(0);
    }

    logging::init(&args);

    if !args.has_targets() {
        eprintln!("Usage: {} [options] [hosts...]", report::SCANNER_NAME);
        eprintln!();
        eprintln!("Hosts are specified on the command line unless --file is given.");
        std::process::exit(1);
    }

    if args.syslog {
        logging::syslog_start(&std::env::args().collect::<Vec<_>>());
    }
    info!("Starting {} {}", report::SCANNER_NAME, report::SCANNER_VERSION);

    if let Err(e) = run(&args) {
        eprintln!("{}: {e}", report::SCANNER_NAME);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> rawip_scan_engine::Result<()> {
    let resolver = DnsLookupResolver;
    let mut adapter = NullAdapter;
    adapter.initialise();

    let mut table = HostTable::new();
    targets::populate(&mut table, args, &resolver, &mut adapter)?;

    report::print_start_banner(table.num_hosts());
    if args.verbose > 2 {
        report::dump_host_list(&table);
    }

    let cfg = EngineConfig {
        retry: args.retry,
        initial_timeout_us: args.timeout * 1000,
        min_interval_us: args.interval * 1000,
        backoff_factor: args.backoff,
        source_port: args.sport,
        dest_port: args.dport,
        local_data: args.data.clone(),
        verbose: args.verbose,
        debug: args.debug,
    };

    let socket = Box::new(UdpRawSocket::new()?);
    let clock = Box::new(SystemClock);
    let mut engine = Engine::new(table, cfg, socket, Box::new(adapter), clock);
    let stats = engine.run()?;

    report::print_end_banner(stats);
    if args.syslog {
        logging::syslog_end(stats.num_hosts, stats.elapsed.as_secs_f64(), stats.responders);
    }
    info!(
        "Ending: {} scanned in {:.3?}, {} responded",
        stats.num_hosts, stats.elapsed, stats.responders
    );
    Ok(())
}
