//! The `DatagramSocket`/`SocketFactory` capability boundary.
//!
//! Per the spec's scope (§1), UDP socket I/O is an external collaborator:
//! the host owns real sockets and a real event loop, and hands this core a
//! `SocketFactory` at construction. This mirrors the teacher's `util::Conn`
//! trait object (see `candidate_base.rs`'s `conn: Option<Arc<dyn util::Conn>>`)
//! but is trimmed to exactly the synchronous `send`/`local_addr` surface this
//! core needs — no async, no `recv` (the host drives inbound bytes into the
//! agent itself via `Agent::handle_datagram`, see `agent::mod`).

use std::io;
use std::net::SocketAddr;

/// One bound UDP socket, owned by a `Component`.
pub trait DatagramSocket: std::fmt::Debug {
    /// Sends `buf` to `dest`. Non-blocking; returns the number of bytes
    /// written on success.
    fn send(&self, dest: SocketAddr, buf: &[u8]) -> io::Result<usize>;

    /// The address this socket is bound to.
    fn local_addr(&self) -> SocketAddr;
}

/// Binds new `DatagramSocket`s on demand. Supplied by the host; this core
/// never opens a socket itself.
pub trait SocketFactory: std::fmt::Debug {
    /// Binds a socket to `local_addr` (port 0 means "any free port").
    fn bind(&self, local_addr: SocketAddr) -> io::Result<Box<dyn DatagramSocket>>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::net::{IpAddr, Ipv4Addr};

    /// An in-memory socket that records everything sent through it, for unit
    /// tests that don't want real UDP.
    #[derive(Debug)]
    pub struct RecordingSocket {
        addr: SocketAddr,
        pub sent: RefCell<Vec<(SocketAddr, Vec<u8>)>>,
    }

    impl RecordingSocket {
        #[must_use]
        pub fn new(addr: SocketAddr) -> Self {
            Self {
                addr,
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl DatagramSocket for RecordingSocket {
        fn send(&self, dest: SocketAddr, buf: &[u8]) -> io::Result<usize> {
            self.sent.borrow_mut().push((dest, buf.to_vec()));
            Ok(buf.len())
        }

        fn local_addr(&self) -> SocketAddr {
            self.addr
        }
    }

    #[derive(Debug, Default)]
    pub struct NextPortFactory {
        next_port: RefCell<u16>,
    }

    impl NextPortFactory {
        #[must_use]
        pub fn starting_at(port: u16) -> Self {
            Self {
                next_port: RefCell::new(port),
            }
        }
    }

    impl SocketFactory for NextPortFactory {
        fn bind(&self, local_addr: SocketAddr) -> io::Result<Box<dyn DatagramSocket>> {
            let addr = if local_addr.port() == 0 {
                let mut next = self.next_port.borrow_mut();
                let port = *next;
                *next += 1;
                SocketAddr::new(local_addr.ip(), port)
            } else {
                local_addr
            };
            Ok(Box::new(RecordingSocket::new(addr)))
        }
    }

    #[must_use]
    pub fn loopback() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }
}
