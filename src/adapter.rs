//! Protocol adapter boundary.
//!
//! The engine is protocol-neutral; a concrete scanner (SQL Slammer, or any
//! other single-packet UDP service) supplies a `ProtocolAdapter` that
//! knows how to build a probe and render a response. This is the Rust
//! expression of the original's weakly-linked `local_*` hooks: a trait
//! object handed to `Engine::new` rather than reached through globals.

use std::net::Ipv4Addr;

use crate::engine::EngineConfig;
use crate::host_table::HostEntry;

pub mod null;

pub trait ProtocolAdapter {
    /// One-shot setup, called after CLI defaults are applied but before the
    /// host table is populated.
    fn initialise(&mut self) {}

    /// Give the adapter first refusal on adding a target (e.g. CIDR
    /// expansion). Returning `Some(addr)` pre-empts the default
    /// single-name resolve-and-add; `None` falls through to it.
    fn local_add_host(&mut self, _name: &str, _timeout_ms: u64) -> Option<Ipv4Addr> {
        None
    }

    /// Build the full wire packet (IP + UDP + payload) addressed to
    /// `entry.addr:dest_port` with `source_port` as configured.
    fn build_probe(&self, entry: &HostEntry, cfg: &EngineConfig) -> Vec<u8>;

    /// Render a matched response to stdout.
    fn display_response(&self, bytes: &[u8], entry: &HostEntry, peer: Ipv4Addr);

    fn clean_up(&mut self) {}

    /// Extra text appended to `--help` output, below the engine's own
    /// option list, for adapter-specific flags or behaviour.
    fn local_help(&self) -> Option<String> {
        None
    }

    /// Extra text appended to `--version` output, below the engine's own
    /// version line, typically the adapter's own version identifier.
    fn local_version(&self) -> Option<String> {
        None
    }
}
