//! Candidate pairs and the RFC 5245 §5.7.2 pair-priority formula.
//!
//! Grounded in `candidate/candidate_base.rs`'s `CandidatePair`, with one
//! deliberate generalization: the teacher crate never implements the
//! foundation-freezing algorithm (§4.3 item 5 of the core spec) and has no
//! `Frozen` state. This core adds it, since the spec requires it.

use stun::agent::TransactionId;

use crate::candidate::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePairState {
    /// A check has not been performed and won't be scheduled until its
    /// foundation is unfrozen.
    Frozen,
    /// A check has not been performed for this pair, but it is eligible to
    /// be scheduled on the next tick.
    Waiting,
    /// A check has been sent; the transaction is in progress.
    InProgress,
    /// The check for this pair succeeded and the pair is valid.
    Succeeded,
    /// The check for this pair failed, or its final retransmit timed out.
    Failed,
}

impl std::fmt::Display for CandidatePairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Frozen => "frozen",
            Self::Waiting => "waiting",
            Self::InProgress => "in-progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A stable identifier for a pair within a stream's check list, used instead
/// of exposing list nodes or live pointers (§9 re-architecture guidance).
pub type PairId = u64;

#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub id: PairId,
    pub local: Candidate,
    pub remote: Candidate,
    pub priority: u64,
    pub state: CandidatePairState,
    pub nominated: bool,
    /// Set once a success response has been received, independent of
    /// `nominated` — a pair can be valid without being the selected one.
    pub valid: bool,
    pub last_txid: Option<TransactionId>,
    pub retransmit_count: u8,
    /// Monotonic clock deadline (milliseconds since the agent's epoch) at
    /// which this pair's next retransmit/keepalive is due. `None` means "not
    /// currently scheduled".
    pub next_tick_at: Option<u64>,
    /// Whether USE-CANDIDATE rode on the outstanding/most recent outgoing
    /// check for this pair. Nomination on a success response only applies if
    /// this is set, so a controlling agent's ordinary (non-nominating)
    /// checks never install a pair on their own.
    pub use_candidate_sent: bool,
}

impl CandidatePair {
    #[must_use]
    pub fn new(id: PairId, local: Candidate, remote: Candidate, controlling: bool) -> Self {
        let priority = pair_priority(&local, &remote, controlling);
        Self {
            id,
            local,
            remote,
            priority,
            state: CandidatePairState::Frozen,
            nominated: false,
            valid: false,
            last_txid: None,
            retransmit_count: 0,
            next_tick_at: None,
            use_candidate_sent: false,
        }
    }

    /// Recomputes `priority` for the (possibly new) controlling role. Called
    /// after a tie-breaker role-conflict resolution flips the agent's role.
    pub fn recompute_priority(&mut self, controlling: bool) {
        self.priority = pair_priority(&self.local, &self.remote, controlling);
    }

    /// Same local and remote transport addresses — used to detect that an
    /// inbound check matches an already-formed pair.
    #[must_use]
    pub fn matches(&self, local: &Candidate, remote: &Candidate) -> bool {
        self.local.same_transport_address(local) && self.remote.same_transport_address(remote)
    }
}

/// RFC 5245 §5.7.2: `2^32 * min(G, D) + 2 * max(G, D) + (G > D ? 1 : 0)`,
/// where G is the controlling agent's candidate priority and D the
/// controlled agent's.
#[must_use]
pub fn pair_priority(local: &Candidate, remote: &Candidate, local_is_controlling: bool) -> u64 {
    let (g, d) = if local_is_controlling {
        (local.priority, remote.priority)
    } else {
        (remote.priority, local.priority)
    };
    (1u64 << 32) * u64::from(g.min(d)) + 2 * u64::from(g.max(d)) + u64::from(g > d)
}

#[cfg(test)]
mod pair_module_test {
    use super::*;
    use crate::address::NiceAddress;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> NiceAddress {
        NiceAddress::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), port)
    }

    #[test]
    fn test_pair_priority_symmetric_under_min_max() {
        let local = Candidate::host(1, addr(1), 0);
        let remote = Candidate::host(1, addr(2), 0);
        // Same priority formula inputs either way since both are host/same component.
        let p1 = pair_priority(&local, &remote, true);
        let p2 = pair_priority(&local, &remote, false);
        assert_eq!(p1, p2);
    }
}
