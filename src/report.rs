//! Startup banner, host-list dump, and final statistics: fixed-text
//! stdout output that tooling can reliably parse or grep.

use crate::engine::ScanStats;
use crate::host_table::HostTable;

pub const SCANNER_NAME: &str = "rawip-scan-engine";
pub const SCANNER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PACKAGE_STRING: &str = concat!("rawip-scan-engine ", env!("CARGO_PKG_VERSION"));

pub fn print_start_banner(num_hosts: u32) {
    println!(
        "Starting {SCANNER_NAME} {SCANNER_VERSION} ({PACKAGE_STRING}) with {num_hosts} hosts"
    );
}

/// `--verbose=3` host-list dump, matching the original's `dump_list`.
pub fn dump_host_list(table: &HostTable) {
    println!("Host List:\n");
    println!("Entry\tIP Address");
    for entry in table.iter_in_order() {
        println!("{}\t{}", entry.n, entry.addr);
    }
    println!("\nTotal of {} host entries.\n", table.num_hosts());
}

pub fn print_end_banner(stats: ScanStats) {
    println!();
    let elapsed_seconds = stats.elapsed.as_secs_f64();
    println!(
        "Ending {SCANNER_NAME} {SCANNER_VERSION} ({PACKAGE_STRING}): {} hosts scanned in {elapsed_seconds:.3} seconds.  {} responded",
        stats.num_hosts, stats.responders
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn dump_host_list_preserves_insertion_order() {
        let mut table = HostTable::new();
        table.add_host(Ipv4Addr::new(10, 0, 0, 1), 1000);
        table.add_host(Ipv4Addr::new(10, 0, 0, 2), 1000);
        // Smoke test only: this prints to stdout, nothing to assert on
        // beyond "it doesn't panic while the table has entries".
        dump_host_list(&table);
    }
}
