//! Logging setup.
//!
//! Replaces the original's compile-time `#ifdef SYSLOG` with structured
//! `tracing` output on stderr plus an optional runtime-gated syslog line
//! at `LOG_INFO`, preserving the exact start/end message text the original
//! emits ("Starting: <argv>" / "Ending: N scanned in T seconds. R
//! responded") so tooling that greps syslog keeps working.

use tracing_subscriber::EnvFilter;

use crate::args::Args;

/// Initialise the `tracing` subscriber. `-d`/`--debug` (repeatable) raises
/// verbosity for timing traces; `-v`/`--verbose` (repeatable) raises it for
/// engine progress messages (every send/receive at `-vv`). The filter level
/// tracks whichever knob asks for more, so `-vv` alone is enough to see the
/// per-packet `info!` lines without also passing `-d`.
pub fn init(args: &Args) {
    let level = if args.debug >= 2 {
        "trace"
    } else if args.debug == 1 {
        "debug"
    } else if args.verbose >= 2 {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("rawip_scan_engine={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Optional syslog emission, gated by `--syslog` (a runtime toggle in
/// place of the original's compile-time `#ifdef SYSLOG`).
pub fn syslog_start(argv: &[String]) {
    log_syslog(&format!("Starting: {}", argv.join(" ")));
}

pub fn syslog_end(num_hosts: u32, elapsed_seconds: f64, responders: u32) {
    log_syslog(&format!(
        "Ending: {num_hosts} scanned in {elapsed_seconds:.3} seconds. {responders} responded"
    ));
}

fn log_syslog(message: &str) {
    match syslog::unix(syslog::Facility::LOG_USER) {
        Ok(mut writer) => {
            if let Err(e) = writer.info(message) {
                tracing::warn!("syslog write failed: {e}");
            }
        }
        Err(e) => tracing::warn!("syslog connect failed: {e}"),
    }
}
