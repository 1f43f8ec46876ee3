//! Hostname -> IPv4 resolution.
//!
//! Pulled out behind a trait so the engine never does its own DNS I/O; the
//! runnable binary needs a concrete default, and `dns-lookup`'s blocking
//! `lookup_host` mirrors the original's synchronous `gethostbyname` call
//! exactly, with no async runtime pulled in for a single-threaded engine.

use std::net::Ipv4Addr;

use crate::error::ScanError;

pub trait Resolver {
    /// Resolve `name` to a single IPv4 address, or a raw dotted-quad is
    /// parsed directly without a lookup. A resolution failure is fatal to
    /// the caller, not retried or skipped.
    fn resolve_v4(&self, name: &str) -> Result<Ipv4Addr, ScanError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DnsLookupResolver;

impl Resolver for DnsLookupResolver {
    fn resolve_v4(&self, name: &str) -> Result<Ipv4Addr, ScanError> {
        if let Ok(addr) = name.parse::<Ipv4Addr>() {
            return Ok(addr);
        }
        let ips = dns_lookup::lookup_host(name).map_err(|e| ScanError::Resolve {
            host: name.to_string(),
            source: e,
        })?;
        ips.into_iter()
            .find_map(|ip| match ip {
                std::net::IpAddr::V4(v4) => Some(v4),
                std::net::IpAddr::V6(_) => None,
            })
            .ok_or_else(|| ScanError::Resolve {
                host: name.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no A record for host",
                ),
            })
    }
}

/// Not behind `#[cfg(test)]` because `tests/` integration tests link the
/// crate without that cfg and still need it.
pub mod fake {
    use super::*;
    use std::collections::HashMap;

    /// Fixed hostname -> address table, for tests that exercise `add_host`
    /// without touching real DNS.
    #[derive(Default)]
    pub struct FakeResolver {
        pub table: HashMap<String, Ipv4Addr>,
    }

    impl FakeResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, name: &str, addr: Ipv4Addr) -> Self {
            self.table.insert(name.to_string(), addr);
            self
        }
    }

    impl Resolver for FakeResolver {
        fn resolve_v4(&self, name: &str) -> Result<Ipv4Addr, ScanError> {
            if let Ok(addr) = name.parse::<Ipv4Addr>() {
                return Ok(addr);
            }
            self.table.get(name).copied().ok_or_else(|| ScanError::Resolve {
                host: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not in fake table"),
            })
        }
    }
}
