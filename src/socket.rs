//! Raw IPv4 send/receive with a `select`-based timeout.
//!
//! `RawSocket` is the narrow interface the engine needs: "send bytes to an
//! address" and "receive the next datagram with source address, or time
//! out". The production implementation opens an `IPPROTO_RAW`/`IP_HDRINCL`
//! socket the way the original does, and waits with
//! `nix::sys::select::select`, the direct analogue of the C code's
//! `select(2)` call in `recvfrom_wto`.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

use nix::sys::select::{select, FdSet};
use nix::sys::time::TimeVal;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::debug;

use crate::error::ScanError;

/// Outcome of one bounded receive attempt.
#[derive(Debug)]
pub enum RecvOutcome {
    Received { n: usize, peer: Ipv4Addr },
    Timeout,
}

pub trait RawSocket {
    /// Transmit a pre-built packet (the adapter already assembled the IP +
    /// UDP + payload bytes) to `dst`.
    fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> Result<usize, ScanError>;

    /// Wait at most `timeout` for one datagram. `ECONNREFUSED` (stray ICMP
    /// port-unreachable surfacing on the raw socket) is folded into
    /// `Timeout` because it cannot be attributed to a specific host.
    fn recv_from_wto(&self, buf: &mut [u8], timeout: Duration) -> Result<RecvOutcome, ScanError>;
}

/// Raw `IPPROTO_RAW`/`IP_HDRINCL` socket, matching the original's
/// `socket(AF_INET, SOCK_RAW, IPPROTO_RAW)` + `setsockopt(IP_HDRINCL)`.
pub struct UdpRawSocket {
    socket: Socket,
}

impl UdpRawSocket {
    pub fn new() -> Result<Self, ScanError> {
        let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::from(libc::IPPROTO_RAW)))
            .map_err(ScanError::Socket)?;
        socket.set_header_included_v4(true).map_err(ScanError::Socket)?;
        Ok(Self { socket })
    }
}

impl RawSocket for UdpRawSocket {
    fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> Result<usize, ScanError> {
        self.socket
            .send_to(buf, &SockAddr::from(std::net::SocketAddr::V4(dst)))
            .map_err(ScanError::Socket)
    }

    fn recv_from_wto(&self, buf: &mut [u8], timeout: Duration) -> Result<RecvOutcome, ScanError> {
        let fd = self.socket.as_raw_fd();
        // Safety: `fd` outlives this select() call; it is owned by `self.socket`.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut read_fds = FdSet::new();
        read_fds.insert(borrowed);
        let mut tv = TimeVal::new(
            timeout.as_secs() as i64,
            timeout.subsec_micros() as i64,
        );

        let n_ready = select(fd + 1, Some(&mut read_fds), None, None, Some(&mut tv)).map_err(|e| {
            ScanError::Socket(std::io::Error::from_raw_os_error(e as i32))
        })?;
        debug!(n_ready, timeout_us = timeout.as_micros() as u64, "recvfrom_wto: select returned");
        if n_ready == 0 {
            return Ok(RecvOutcome::Timeout);
        }

        let mut uninit = vec![std::mem::MaybeUninit::new(0u8); buf.len()];
        match self.socket.recv_from(&mut uninit) {
            Ok((n, addr)) => {
                for (dst, src) in buf.iter_mut().zip(uninit.iter()).take(n) {
                    *dst = unsafe { src.assume_init() };
                }
                let peer = match addr.as_socket_ipv4() {
                    Some(v4) => *v4.ip(),
                    None => return Ok(RecvOutcome::Timeout),
                };
                Ok(RecvOutcome::Received { n, peer })
            }
            Err(e) if e.raw_os_error() == Some(libc::ECONNREFUSED) => Ok(RecvOutcome::Timeout),
            Err(e) => Err(ScanError::Socket(e)),
        }
    }
}

/// In-memory `RawSocket` for unit and integration tests. Not behind
/// `#[cfg(test)]` because `tests/` integration tests link the crate
/// without that cfg and still need it.
pub mod fake {
    use super::*;
    use crate::time::fake::FakeClock;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// In-memory `RawSocket` for engine tests. Shares a `FakeClock` with
    /// the engine under test and *advances it* on a bounded wait, the same
    /// way a real `select()` call lets wall-clock time pass while blocked:
    /// a queued reply due before the requested timeout elapses advances
    /// the clock to the reply's arrival time and is returned; otherwise
    /// the clock advances by the full timeout and `Timeout` is returned.
    pub struct FakeSocket {
        clock: Rc<FakeClock>,
        pub sent: RefCell<Vec<(Vec<u8>, SocketAddrV4)>>,
        replies: RefCell<VecDeque<(std::time::Instant, Ipv4Addr, Vec<u8>)>>,
    }

    impl FakeSocket {
        pub fn new(clock: Rc<FakeClock>) -> Self {
            Self {
                clock,
                sent: RefCell::new(Vec::new()),
                replies: RefCell::new(VecDeque::new()),
            }
        }

        pub fn queue_reply_at(&self, at: std::time::Instant, from: Ipv4Addr, payload: Vec<u8>) {
            self.replies.borrow_mut().push_back((at, from, payload));
        }
    }

    impl RawSocket for FakeSocket {
        fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> Result<usize, ScanError> {
            self.sent.borrow_mut().push((buf.to_vec(), dst));
            Ok(buf.len())
        }

        fn recv_from_wto(&self, buf: &mut [u8], timeout: Duration) -> Result<RecvOutcome, ScanError> {
            let now = self.clock.now();
            let deadline = now + timeout;
            let mut replies = self.replies.borrow_mut();
            if let Some((at, _, _)) = replies.front() {
                if *at <= deadline {
                    let at = *at;
                    let (_, from, payload) = replies.pop_front().unwrap();
                    self.clock.advance(at.saturating_duration_since(now));
                    let n = payload.len().min(buf.len());
                    buf[..n].copy_from_slice(&payload[..n]);
                    return Ok(RecvOutcome::Received { n, peer: from });
                }
            }
            self.clock.advance(timeout);
            Ok(RecvOutcome::Timeout)
        }
    }

    /// Lets a test hold its own `Rc<FakeSocket>` for post-run assertions
    /// while also handing a clone to the engine as its boxed `RawSocket`.
    impl RawSocket for Rc<FakeSocket> {
        fn send_to(&self, buf: &[u8], dst: SocketAddrV4) -> Result<usize, ScanError> {
            (**self).send_to(buf, dst)
        }

        fn recv_from_wto(&self, buf: &mut [u8], timeout: Duration) -> Result<RecvOutcome, ScanError> {
            (**self).recv_from_wto(buf, timeout)
        }
    }
}
