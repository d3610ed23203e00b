//! Point-in-time diagnostics snapshots.
//!
//! Trimmed from the teacher's `agent/agent_stats.rs`: that struct carries
//! TURN/bandwidth-estimation/congestion-control fields this core has no way
//! to populate (TURN allocation and DTLS/SRTP are Non-goals). Only the
//! counters `Component`/`ConnCheckEngine` can actually maintain are kept.

use crate::candidate::{Candidate, CandidateType};
use crate::pair::CandidatePairState;

#[derive(Debug, Clone)]
pub struct CandidateStats {
    pub candidate_type: CandidateType,
    pub foundation: String,
    pub priority: u32,
}

impl From<&Candidate> for CandidateStats {
    fn from(c: &Candidate) -> Self {
        Self {
            candidate_type: c.candidate_type,
            foundation: c.foundation.clone(),
            priority: c.priority,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidatePairStats {
    pub local_foundation: String,
    pub remote_foundation: String,
    pub state: CandidatePairState,
    pub nominated: bool,
    pub priority: u64,
    pub requests_sent: u64,
    pub responses_received: u64,
}
