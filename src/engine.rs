//! The scan engine: global pacing, per-host retry/backoff, and the
//! cyclic round-robin traversal, all interlocking in one loop. This is the
//! non-trivial part of the crate; everything else is glue around it.

use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::adapter::ProtocolAdapter;
use crate::error::ScanError;
use crate::host_table::HostTable;
use crate::socket::{RawSocket, RecvOutcome};
use crate::time::Clock;

/// Immutable scan parameters, fixed for the life of one `Engine` run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: u32,
    pub initial_timeout_us: u64,
    pub min_interval_us: u64,
    pub backoff_factor: f64,
    pub source_port: u16,
    pub dest_port: u16,
    pub local_data: Option<String>,
    pub verbose: u8,
    pub debug: u8,
}

/// Final report, printed by `report::print_summary`.
#[derive(Debug, Clone, Copy)]
pub struct ScanStats {
    pub num_hosts: u32,
    pub responders: u32,
    pub elapsed: Duration,
}

pub struct Engine<'a> {
    table: HostTable,
    cfg: EngineConfig,
    socket: Box<dyn RawSocket + 'a>,
    adapter: Box<dyn ProtocolAdapter + 'a>,
    clock: Box<dyn Clock + 'a>,

    last_packet_time: Option<Instant>,
    req_interval_us: u64,
    cum_err: i64,
    reset_cum_err: bool,
    pass_no: u32,
    first_timeout: bool,

    responders: u32,
}

impl<'a> Engine<'a> {
    pub fn new(
        table: HostTable,
        cfg: EngineConfig,
        socket: Box<dyn RawSocket + 'a>,
        adapter: Box<dyn ProtocolAdapter + 'a>,
        clock: Box<dyn Clock + 'a>,
    ) -> Self {
        let min_interval_us = cfg.min_interval_us;
        Self {
            table,
            cfg,
            socket,
            adapter,
            clock,
            last_packet_time: None,
            req_interval_us: min_interval_us,
            cum_err: 0,
            reset_cum_err: true,
            pass_no: 0,
            first_timeout: true,
            responders: 0,
        }
    }

    pub fn table(&self) -> &HostTable {
        &self.table
    }

    /// Run the scan to completion: exits when `live_count == 0`.
    pub fn run(&mut self) -> Result<ScanStats, ScanError> {
        let start = self.clock.now();

        while self.table.live_count() > 0 {
            self.tick()?;
        }

        self.adapter.clean_up();
        let elapsed = self.clock.now().saturating_duration_since(start);
        Ok(ScanStats {
            num_hosts: self.table.num_hosts(),
            responders: self.responders,
            elapsed,
        })
    }

    /// One loop iteration: decide whether a probe can go out, update the
    /// pacing/backoff bookkeeping, and always perform exactly one bounded
    /// receive.
    fn tick(&mut self) -> Result<(), ScanError> {
        let now = self.clock.now();
        if self.cfg.debug > 0 {
            debug!(live = self.table.live_count(), "tick");
        }
        let loop_dt = crate::time::micros_between(now, self.last_packet_time.unwrap_or(now));
        // `last_packet_time` starts at None; treat "never sent" as "ready now".
        let loop_dt = if self.last_packet_time.is_none() {
            u64::MAX
        } else {
            loop_dt
        };

        let select_timeout_us = if loop_dt >= self.req_interval_us {
            self.try_send_to_cursor(now, loop_dt)?
        } else {
            self.req_interval_us - loop_dt
        };

        self.receive_and_match(Duration::from_micros(select_timeout_us))
    }

    /// Pacing gate passed; check per-host eligibility and either send,
    /// retire-on-exhaustion, or report "not ready yet".
    fn try_send_to_cursor(&mut self, now: Instant, loop_dt: u64) -> Result<u64, ScanError> {
        let Some(cursor) = self.table.cursor() else {
            return Ok(self.req_interval_us);
        };
        let last_sent = self.table.get(cursor).last_send_time;
        let host_dt = match last_sent {
            None => u64::MAX,
            Some(t) => crate::time::micros_between(now, t),
        };
        let host_timeout = self.table.get(cursor).timeout_us;

        if host_dt < host_timeout {
            // Not ready: no point advancing the cursor, host n+1 would not
            // be ready either (non-decreasing per-host gaps in order).
            if self.cfg.debug > 0 {
                debug!(host = self.table.get(cursor).n, host_dt, host_timeout, "pacing gate: host not ready");
            }
            self.reset_cum_err = true;
            return Ok(host_timeout - host_dt);
        }
        if self.cfg.debug > 0 {
            debug!(host = self.table.get(cursor).n, "pacing gate: host ready");
        }

        if self.reset_cum_err {
            self.cum_err = 0;
            self.req_interval_us = self.cfg.min_interval_us;
            self.reset_cum_err = false;
        } else {
            self.cum_err += loop_dt as i64 - self.cfg.min_interval_us as i64;
            self.req_interval_us = if self.cum_err >= 0 {
                self.req_interval_us.saturating_sub(self.cum_err as u64)
            } else {
                self.req_interval_us.saturating_add((-self.cum_err) as u64)
            };
        }

        if self.cfg.verbose > 0 {
            let num_sent = self.table.get(cursor).num_sent;
            if num_sent > self.pass_no {
                warn!("---\tPass {} complete", self.pass_no + 1);
                self.pass_no = num_sent;
            }
        }

        let select_timeout = if self.table.get(cursor).num_sent >= self.cfg.retry {
            if self.cfg.debug > 0 {
                debug!(host = self.table.get(cursor).n, "host eligibility: retries exhausted");
            }
            self.timeout_cursor_and_catch_up(now);
            self.req_interval_us
        } else {
            if self.cfg.debug > 0 {
                debug!(host = self.table.get(cursor).n, "host eligibility: eligible to send");
            }
            self.send_to_cursor(cursor)?;
            self.req_interval_us
        };
        Ok(select_timeout)
    }

    /// Retry limit exhausted: retire the host, still charge the pacing
    /// clock as if a packet went out — this anchors the drift compensation
    /// to real elapsed time rather than to "time since last actual
    /// transmission", which is what lets the catch-up sweep below recover
    /// cleanly — then run the catch-up sweep once.
    fn timeout_cursor_and_catch_up(&mut self, now: Instant) {
        let cursor = self.table.cursor().expect("cursor present while live");
        let entry = self.table.get(cursor);
        if self.cfg.verbose > 1 {
            warn!(
                "---\tRemoving host entry {} ({}) - Timeout",
                entry.n, entry.addr
            );
        }
        if self.cfg.debug > 0 {
            debug!("Timing out host {}", entry.n);
        }
        self.table.remove_host(cursor);

        if self.first_timeout {
            self.catch_up_sweep(now);
            self.first_timeout = false;
        }
        self.last_packet_time = Some(now);
    }

    /// While the (possibly new) cursor is also simultaneously past due,
    /// drain the backlog in one pass so pacing resumes cleanly. One-shot:
    /// only ever runs on the first timeout of the program (it exists to
    /// absorb every host's initial `last_send_time = None` sentinel).
    fn catch_up_sweep(&mut self, now: Instant) {
        if self.cfg.debug > 0 {
            debug!("catch_up_sweep: starting one-shot backlog drain");
        }
        while self.table.live_count() > 0 {
            let Some(cursor) = self.table.cursor() else { break };
            let entry = self.table.get(cursor);
            let host_dt = match entry.last_send_time {
                None => u64::MAX,
                Some(t) => crate::time::micros_between(now, t),
            };
            if host_dt < entry.timeout_us {
                break;
            }
            if entry.live {
                if self.cfg.verbose > 1 {
                    warn!(
                        "---\tRemoving host {} ({}) - Catch-Up Timeout",
                        entry.n, entry.addr
                    );
                }
                self.table.remove_host(cursor);
            } else {
                self.table.advance_cursor();
            }
        }
    }

    fn send_to_cursor(&mut self, cursor: usize) -> Result<(), ScanError> {
        {
            let entry = self.table.get_mut(cursor);
            if entry.num_sent > 0 {
                entry.timeout_us = ((entry.timeout_us as f64) * self.cfg.backoff_factor) as u64;
            }
        }
        let entry = self.table.get(cursor);
        let packet = self.adapter.build_probe(entry, &self.cfg);
        let dst = SocketAddrV4::new(entry.addr, self.cfg.dest_port);
        self.socket.send_to(&packet, dst)?;

        let now = self.clock.now();
        let entry = self.table.get_mut(cursor);
        entry.last_send_time = Some(now);
        entry.num_sent += 1;
        self.last_packet_time = Some(now);

        if self.cfg.verbose > 1 {
            info!("---\tSent probe #{} to host {}", entry.num_sent, entry.n);
        }

        self.table.advance_cursor();
        Ok(())
    }

    fn receive_and_match(&mut self, timeout: Duration) -> Result<(), ScanError> {
        let mut buf = [0u8; 65535];
        if self.cfg.debug > 0 {
            debug!(timeout_us = timeout.as_micros() as u64, "recvfrom_wto: blocking on socket");
        }
        match self.socket.recv_from_wto(&mut buf, timeout)? {
            RecvOutcome::Timeout => {
                if self.cfg.debug > 0 {
                    debug!("recvfrom_wto: timed out, nothing received");
                }
                Ok(())
            }
            RecvOutcome::Received { n, peer } => {
                let Some(cursor) = self.table.cursor() else {
                    warn!("---\tIgnoring {n} bytes from unknown host {peer} (no hosts left)");
                    return Ok(());
                };
                let start = self.table.prev_of(cursor);
                let matched_entry = self.table.find_host_by_ip(start, peer);
                if self.cfg.debug > 0 {
                    debug!(?peer, found = matched_entry.is_some(), "find_host_by_ip");
                }
                match matched_entry {
                    Some(matched) => {
                        if self.cfg.verbose > 1 {
                            let num_recv = self.table.get(matched).num_recv;
                            info!("---\tReceived packet #{num_recv} from {peer}");
                        }
                        self.adapter
                            .display_response(&buf[..n], self.table.get(matched), peer);
                        self.table.get_mut(matched).num_recv += 1;
                        self.responders += 1;
                        if self.cfg.verbose > 1 {
                            let entry = self.table.get(matched);
                            warn!(
                                "---\tRemoving host entry {} ({}) - Received {n} bytes",
                                entry.n, entry.addr
                            );
                        }
                        self.table.remove_host(matched);
                        Ok(())
                    }
                    None => {
                        warn!("---\tIgnoring {n} bytes from unknown host {peer}");
                        Ok(())
                    }
                }
            }
        }
    }
}
