//! A trivial protocol adapter used by the crate's own tests and as a
//! worked example for downstream scanners. It sends an empty UDP payload
//! and treats any reply as a match, which makes it useful for exercising
//! the engine against a service that merely needs to be proven reachable.

use std::net::Ipv4Addr;

use crate::adapter::ProtocolAdapter;
use crate::engine::EngineConfig;
use crate::host_table::HostEntry;

#[derive(Debug, Default)]
pub struct NullAdapter;

impl ProtocolAdapter for NullAdapter {
    fn build_probe(&self, _entry: &HostEntry, cfg: &EngineConfig) -> Vec<u8> {
        cfg.local_data
            .as_ref()
            .map(|s| s.as_bytes().to_vec())
            .unwrap_or_default()
    }

    fn display_response(&self, bytes: &[u8], entry: &HostEntry, peer: Ipv4Addr) {
        println!("{}\t{}\t{} bytes", entry.n, peer, bytes.len());
    }

    fn local_help(&self) -> Option<String> {
        Some("null adapter: no protocol-specific options".to_string())
    }

    fn local_version(&self) -> Option<String> {
        Some("null-adapter 0.1".to_string())
    }
}
