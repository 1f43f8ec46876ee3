//! Error taxonomy for the scan engine.
//!
//! Mirrors the four categories from the original C implementation's
//! `err_sys`/`err_msg`/`warn_sys`/`warn_msg` split (fatal syscall, fatal
//! usage, non-fatal anomaly, transient/expected), but propagates as a
//! `Result` instead of calling `exit()` in place so library consumers can
//! decide how to react. `main.rs` is the only place that turns this into a
//! process exit code.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to resolve host {host}: {source}")]
    Resolve { host: String, source: io::Error },

    #[error("socket error: {0}")]
    Socket(#[from] io::Error),

    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("{0}")]
    Usage(String),

    #[error("no hosts to process")]
    EmptyHostList,
}

pub type Result<T> = std::result::Result<T, ScanError>;
