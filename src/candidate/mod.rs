//! Immutable candidate descriptors and the RFC 5245 §4.1.2 priority formula.
//!
//! Grounded in the teacher's `candidate/candidate_base.rs` (`foundation`,
//! `priority`) and `candidate_host.rs`/`candidate_peer_reflexive.rs` (the
//! per-type constructors), collapsed from a `dyn Candidate` trait-object
//! hierarchy into one plain, `Clone`-able struct: this core has no TCP
//! candidates, no relay client, and no mDNS resolution in flight, so the
//! trait-object indirection the teacher needs to share behaviour across five
//! candidate kinds buys nothing here.

#[cfg(test)]
mod candidate_test;

use std::fmt;

use crc::{Crc, CRC_32_ISCSI};
use serde::{Deserialize, Serialize};

use crate::address::NiceAddress;
use crate::rand::ice_safe_string;

pub(crate) const COMPONENT_RTP: u16 = 1;
pub(crate) const COMPONENT_RTCP: u16 = 2;

/// The local preference used whenever there is a single candidate of a given
/// type per component. RFC 5245 §4.1.2.1: "When there is only a single IP
/// address, this value SHOULD be set to 65535." IPv6-specific multihomed
/// ordering beyond this default is out of scope (see spec Non-goals).
pub const DEFAULT_LOCAL_PREFERENCE: u16 = 65535;

/// Maximum allowed length of a foundation string, RFC 5245 §15.1.
pub const MAX_FOUNDATION_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateType {
    Host,
    ServerReflexive,
    PeerReflexive,
    /// Accepted by the data model so that a future TURN extension can
    /// construct pairs with the same formulas; `DiscoveryEngine` never
    /// produces one (TURN relay allocation is out of scope, see spec §1).
    Relayed,
}

impl CandidateType {
    /// RFC 5245 §4.1.2.2 recommended type preferences.
    #[must_use]
    pub const fn preference(self) -> u32 {
        match self {
            Self::Host => 126,
            Self::PeerReflexive => 110,
            Self::ServerReflexive => 100,
            Self::Relayed => 0,
        }
    }
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Host => "host",
            Self::ServerReflexive => "srflx",
            Self::PeerReflexive => "prflx",
            Self::Relayed => "relay",
        };
        write!(f, "{s}")
    }
}

/// RFC 5245 §4.1.2: `(type_pref << 24) | (local_pref << 8) | (256 - component_id)`.
#[must_use]
pub fn compute_priority(candidate_type: CandidateType, local_pref: u16, component_id: u16) -> u32 {
    (candidate_type.preference() << 24)
        + (u32::from(local_pref) << 8)
        + (256 - u32::from(component_id))
}

/// An arbitrary string identifying `(type, base_addr, stun_server)`, used by
/// the freezing algorithm to group equivalent candidates. Grounded in
/// `CandidateBase::foundation`, generalized to fold in an optional STUN
/// server address so that server-reflexive candidates discovered against
/// different servers do not collide.
#[must_use]
pub fn compute_foundation(
    candidate_type: CandidateType,
    base_addr: &NiceAddress,
    stun_server: Option<&NiceAddress>,
) -> String {
    let mut buf = Vec::new();
    buf.extend_from_slice(candidate_type.to_string().as_bytes());
    buf.extend_from_slice(base_addr.ip().to_string().as_bytes());
    if let Some(server) = stun_server {
        buf.extend_from_slice(server.to_string().as_bytes());
    }
    let checksum = Crc::<u32>::new(&CRC_32_ISCSI).checksum(&buf);
    let foundation = format!("{checksum}");
    debug_assert!(foundation.len() <= MAX_FOUNDATION_LEN);
    foundation
}

/// An immutable descriptor of one transport address a component could use to
/// receive media. Candidates are never mutated after construction — a
/// change (e.g. a discovered reflexive address) always produces a new
/// `Candidate` appended to the component's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub component_id: u16,
    pub candidate_type: CandidateType,
    pub addr: NiceAddress,
    /// For host candidates, `base_addr == addr`. For reflexive candidates,
    /// the local host address the reflexive mapping was observed through.
    pub base_addr: NiceAddress,
    pub priority: u32,
    pub foundation: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Index into the owning `Component::sockets`, identifying which local
    /// socket this candidate sends/receives on.
    pub socket_ref: usize,
}

impl Candidate {
    fn new(
        component_id: u16,
        candidate_type: CandidateType,
        addr: NiceAddress,
        base_addr: NiceAddress,
        local_pref: u16,
        foundation: String,
        socket_ref: usize,
    ) -> Self {
        Self {
            component_id,
            candidate_type,
            priority: compute_priority(candidate_type, local_pref, component_id),
            addr,
            base_addr,
            foundation,
            username: None,
            password: None,
            socket_ref,
        }
    }

    /// A host candidate: `base_addr == addr`.
    #[must_use]
    pub fn host(component_id: u16, addr: NiceAddress, socket_ref: usize) -> Self {
        let foundation = compute_foundation(CandidateType::Host, &addr, None);
        Self::new(
            component_id,
            CandidateType::Host,
            addr,
            addr,
            DEFAULT_LOCAL_PREFERENCE,
            foundation,
            socket_ref,
        )
    }

    /// A server-reflexive candidate discovered via a STUN Binding success
    /// response. `base_addr` is the host candidate's address the request was
    /// sent from.
    #[must_use]
    pub fn server_reflexive(
        component_id: u16,
        mapped_addr: NiceAddress,
        base_addr: NiceAddress,
        stun_server: &NiceAddress,
        socket_ref: usize,
    ) -> Self {
        let foundation =
            compute_foundation(CandidateType::ServerReflexive, &base_addr, Some(stun_server));
        Self::new(
            component_id,
            CandidateType::ServerReflexive,
            mapped_addr,
            base_addr,
            DEFAULT_LOCAL_PREFERENCE,
            foundation,
            socket_ref,
        )
    }

    /// A peer-reflexive candidate, synthesised when a STUN check arrives
    /// from/maps to an address not already known as a candidate.
    #[must_use]
    pub fn peer_reflexive(
        component_id: u16,
        addr: NiceAddress,
        base_addr: NiceAddress,
        priority_from_peer: Option<u32>,
        socket_ref: usize,
    ) -> Self {
        let foundation = compute_foundation(CandidateType::PeerReflexive, &base_addr, None);
        let mut c = Self::new(
            component_id,
            CandidateType::PeerReflexive,
            addr,
            base_addr,
            DEFAULT_LOCAL_PREFERENCE,
            foundation,
            socket_ref,
        );
        if let Some(priority) = priority_from_peer {
            c.priority = priority;
        }
        c
    }

    /// Assigns the credentials this candidate should be checked with (the
    /// *remote* side's ufrag/pwd when this is a remote candidate object, per
    /// §3's optional `username?`/`password?` fields).
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Two candidates are the same transport address if type, base and
    /// addr all match — used to enforce the §3 local-candidate uniqueness
    /// invariant and to de-duplicate discovered candidates.
    #[must_use]
    pub fn same_transport_address(&self, other: &Self) -> bool {
        self.candidate_type == other.candidate_type
            && self.base_addr == other.base_addr
            && self.addr == other.addr
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} prio {}",
            self.foundation, self.candidate_type, self.addr, self.priority
        )
    }
}

/// Generates a fresh id suitable for logging/diagnostics; not part of the
/// wire format. Grounded in the teacher's `generate_cand_id`.
#[must_use]
pub fn generate_candidate_id() -> String {
    format!("candidate:{}", ice_safe_string(16))
}
