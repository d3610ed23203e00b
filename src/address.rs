//! `NiceAddress`: a transport address decoupled from `std::net::SocketAddr`.
//!
//! The core is handed `SocketAddr`s by the host's socket capability and hands
//! them back out in events and wire attributes; `NiceAddress` exists so that
//! equality and hashing (used as check-list and candidate-set keys) are
//! pinned to exactly family + address bytes + port, matching §3's invariant,
//! rather than relying on whatever `SocketAddr`'s trait impls happen to do
//! (they already satisfy this, but a dedicated type keeps that contract
//! explicit and stable as an API surface).

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NiceAddress {
    ip: IpAddr,
    port: u16,
}

impl NiceAddress {
    #[must_use]
    pub const fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// The "unbound/any" address: port 0.
    #[must_use]
    pub const fn unspecified(ip: IpAddr) -> Self {
        Self::new(ip, 0)
    }

    #[must_use]
    pub const fn ip(&self) -> IpAddr {
        self.ip
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub const fn family(&self) -> AddressFamily {
        match self.ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    #[must_use]
    pub const fn is_unbound(&self) -> bool {
        self.port == 0
    }

    #[must_use]
    pub const fn same_family(&self, other: &Self) -> bool {
        matches!(
            (self.ip, other.ip),
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_))
        )
    }
}

impl From<SocketAddr> for NiceAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl From<NiceAddress> for SocketAddr {
    fn from(addr: NiceAddress) -> Self {
        SocketAddr::new(addr.ip, addr.port)
    }
}

impl fmt::Display for NiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod address_test {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_equality_is_bit_exact_on_family_bytes_port() {
        let a = NiceAddress::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 4000);
        let b = NiceAddress::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 4000);
        let c = NiceAddress::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 4001);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_round_trip_through_socket_addr() {
        let addr = NiceAddress::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9);
        let sock: SocketAddr = addr.into();
        assert_eq!(NiceAddress::from(sock), addr);
    }
}
