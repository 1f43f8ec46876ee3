//! Populate a `HostTable` from the CLI: either `--file` (with `-` meaning
//! stdin) or the trailing positional hosts, one add per name in order so
//! insertion ordinals match the order a user would expect.

use std::io::{BufRead, BufReader};

use crate::adapter::ProtocolAdapter;
use crate::args::Args;
use crate::error::ScanError;
use crate::host_table::HostTable;
use crate::resolver::Resolver;

pub fn populate(
    table: &mut HostTable,
    args: &Args,
    resolver: &dyn Resolver,
    adapter: &mut dyn ProtocolAdapter,
) -> Result<(), ScanError> {
    let initial_timeout_us = args.timeout * 1000;

    let names: Vec<String> = match &args.file {
        Some(path) => read_lines(path)?,
        None => args.hosts.clone(),
    };

    for name in names {
        add_host(table, &name, initial_timeout_us, resolver, adapter)?;
    }

    if table.num_hosts() == 0 {
        return Err(ScanError::EmptyHostList);
    }
    Ok(())
}

fn add_host(
    table: &mut HostTable,
    name: &str,
    initial_timeout_us: u64,
    resolver: &dyn Resolver,
    adapter: &mut dyn ProtocolAdapter,
) -> Result<(), ScanError> {
    // Give the adapter first refusal (e.g. CIDR expansion) before the
    // generic single-name resolve-and-add.
    if let Some(addr) = adapter.local_add_host(name, initial_timeout_us / 1000) {
        table.add_host(addr, initial_timeout_us);
        return Ok(());
    }
    let addr = resolver.resolve_v4(name)?;
    table.add_host(addr, initial_timeout_us);
    Ok(())
}

fn read_lines(path: &str) -> Result<Vec<String>, ScanError> {
    let reader: Box<dyn BufRead> = if path == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let file = std::fs::File::open(path).map_err(ScanError::Io)?;
        Box::new(BufReader::new(file))
    };

    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(ScanError::Io)?;
        if let Some(token) = line.split_whitespace().next() {
            names.push(token.to_string());
        }
    }
    Ok(names)
}
