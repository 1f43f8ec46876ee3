//! Command-line interface. Every long form has the original's short form,
//! `--file=-` means stdin, trailing positional args are hosts unless
//! `--file` is given.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "rawip-scan-engine")]
#[command(about = "Protocol-neutral, rate-controlled, retry-driven UDP scan engine")]
#[command(version)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Args {
    /// Target hosts. Ignored if --file is given.
    pub hosts: Vec<String>,

    /// Read targets one per line from this file ("-" for standard input).
    /// First whitespace-delimited token per line is the target.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<String>,

    /// UDP source port, 0 = random.
    #[arg(short = 's', long, default_value_t = 0)]
    pub sport: u16,

    /// UDP destination port.
    #[arg(short = 'p', long, default_value_t = 0)]
    pub dport: u16,

    /// Total number of attempts per host.
    #[arg(short, long, default_value_t = 3)]
    pub retry: u32,

    /// Initial per-host timeout in milliseconds. Subsequent timeouts are
    /// multiplied by --backoff.
    #[arg(short, long, default_value_t = 500)]
    pub timeout: u64,

    /// Minimum inter-packet interval in milliseconds, across all hosts.
    #[arg(short, long, default_value_t = 75)]
    pub interval: u64,

    /// Per-host timeout multiplier applied after each send beyond the
    /// first.
    #[arg(short, long, default_value_t = 1.5)]
    pub backoff: f64,

    /// Verbose progress messages. Repeat for more detail:
    /// 1=removals/anomalies, 2=every send/receive, 3=dump host list first.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Timing traces on every interesting state transition. Repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Opaque payload override passed through to the protocol adapter.
    #[arg(short = 'D', long, value_name = "STRING")]
    pub data: Option<String>,

    /// Emit start/end banners to syslog (LOG_INFO) in addition to stdout.
    #[arg(long)]
    pub syslog: bool,

    /// Print help, including the protocol adapter's own options, and exit.
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,

    /// Print version, including the protocol adapter's own, and exit.
    #[arg(short = 'V', long = "version", action = clap::ArgAction::SetTrue)]
    pub version: bool,
}

impl Args {
    /// No `--file` and no positional hosts means there is nothing to
    /// scan: a usage error, not an empty successful run.
    pub fn has_targets(&self) -> bool {
        self.file.is_some() || !self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms_identically() {
        let long = Args::try_parse_from([
            "rawip-scan-engine",
            "--sport=1234",
            "--dport=1434",
            "--retry=5",
            "--timeout=200",
            "--interval=50",
            "--backoff=2.0",
            "host1",
        ])
        .unwrap();
        let short = Args::try_parse_from([
            "rawip-scan-engine",
            "-s",
            "1234",
            "-p",
            "1434",
            "-r",
            "5",
            "-t",
            "200",
            "-i",
            "50",
            "-b",
            "2.0",
            "host1",
        ])
        .unwrap();
        assert_eq!(long.sport, short.sport);
        assert_eq!(long.dport, short.dport);
        assert_eq!(long.retry, short.retry);
        assert_eq!(long.timeout, short.timeout);
        assert_eq!(long.interval, short.interval);
        assert_eq!(long.backoff, short.backoff);
        assert_eq!(long.hosts, short.hosts);
    }

    #[test]
    fn verbose_and_debug_are_repeatable_counts() {
        let args = Args::try_parse_from(["rawip-scan-engine", "-vvv", "-dd", "host1"]).unwrap();
        assert_eq!(args.verbose, 3);
        assert_eq!(args.debug, 2);
    }

    #[test]
    fn no_hosts_and_no_file_has_no_targets() {
        let args = Args::try_parse_from(["rawip-scan-engine"]).unwrap();
        assert!(!args.has_targets());
    }

    #[test]
    fn file_dash_means_stdin_is_still_a_target_source() {
        let args = Args::try_parse_from(["rawip-scan-engine", "--file=-"]).unwrap();
        assert!(args.has_targets());
        assert_eq!(args.file.as_deref(), Some("-"));
    }
}
