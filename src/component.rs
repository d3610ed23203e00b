//! One addressable sub-stream (RTP, RTCP, ...) and its state machine.
//!
//! Grounded in the teacher's per-agent connection state (`state/mod.rs`'s
//! `ConnectionState`) generalized to per-*component* granularity, since the
//! spec models state at the component level rather than the whole agent
//! (§3). The legal transition graph is enforced here rather than left to
//! callers, per the §8 monotonicity property.

use std::collections::VecDeque;

use crate::candidate::Candidate;
use crate::pair::CandidatePair;
use crate::socket::DatagramSocket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Disconnected,
    Gathering,
    Connecting,
    Connected,
    Ready,
    /// Terminal until an ICE restart (out of scope for this core).
    Failed,
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Gathering => "gathering",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

pub struct Component {
    pub id: u16,
    pub state: ComponentState,
    pub local_candidates: Vec<Candidate>,
    pub remote_candidates: Vec<Candidate>,
    pub selected_pair: Option<CandidatePair>,
    pub sockets: Vec<Box<dyn DatagramSocket>>,
    /// Set by `ReceivePath` whenever application media was classified and
    /// delivered during the current tick; cleared at the start of each tick.
    /// A component that is seeing live media does not need a keepalive this
    /// round (RFC 8445 §11's "consent freshness" is already satisfied by
    /// real traffic).
    pub media_after_tick: bool,
    /// Bytes queued for the application by `ReceivePath`, drained by
    /// `Agent::recv`.
    pub(crate) inbound: VecDeque<Vec<u8>>,
    pub(crate) bytes_sent: u64,
    pub(crate) bytes_received: u64,
}

impl Component {
    #[must_use]
    pub fn new(id: u16) -> Self {
        Self {
            id,
            state: ComponentState::Disconnected,
            local_candidates: Vec::new(),
            remote_candidates: Vec::new(),
            selected_pair: None,
            sockets: Vec::new(),
            media_after_tick: false,
            inbound: VecDeque::new(),
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// Applies one step of the component state machine. Returns `true` if
    /// the state actually changed (callers use this to decide whether to
    /// emit `component_state_changed`).
    pub(crate) fn transition_to(&mut self, next: ComponentState) -> bool {
        if self.state == next {
            return false;
        }
        // FAILED and READY are absorbing within a session (§8 monotonicity);
        // nothing moves a component out of them short of stream removal.
        if matches!(self.state, ComponentState::Failed | ComponentState::Ready) {
            return false;
        }
        self.state = next;
        true
    }

    pub(crate) fn has_host_candidate(&self) -> bool {
        self.local_candidates
            .iter()
            .any(|c| c.candidate_type == crate::candidate::CandidateType::Host)
    }

    pub(crate) fn push_inbound(&mut self, data: Vec<u8>) {
        self.bytes_received += data.len() as u64;
        self.inbound.push_back(data);
    }

    /// Pops up to `buf.len()` bytes of the oldest queued application
    /// datagram, copying it into `buf`. Returns the number of bytes copied,
    /// or 0 if nothing is queued.
    pub fn recv(&mut self, buf: &mut [u8]) -> usize {
        match self.inbound.pop_front() {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                n
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod component_test {
    use super::*;

    #[test]
    fn test_legal_transitions_advance() {
        let mut c = Component::new(1);
        assert_eq!(c.state, ComponentState::Disconnected);
        assert!(c.transition_to(ComponentState::Gathering));
        assert!(c.transition_to(ComponentState::Connecting));
        assert!(c.transition_to(ComponentState::Connected));
        assert!(c.transition_to(ComponentState::Ready));
        assert_eq!(c.state, ComponentState::Ready);
    }

    #[test]
    fn test_ready_is_absorbing() {
        let mut c = Component::new(1);
        c.state = ComponentState::Ready;
        assert!(!c.transition_to(ComponentState::Failed));
        assert!(!c.transition_to(ComponentState::Connecting));
        assert_eq!(c.state, ComponentState::Ready);
    }

    #[test]
    fn test_failed_is_absorbing() {
        let mut c = Component::new(1);
        c.state = ComponentState::Failed;
        assert!(!c.transition_to(ComponentState::Gathering));
        assert_eq!(c.state, ComponentState::Failed);
    }

    #[test]
    fn test_recv_drains_queue_in_order() {
        let mut c = Component::new(1);
        c.push_inbound(vec![1, 2, 3]);
        c.push_inbound(vec![4, 5]);
        let mut buf = [0u8; 8];
        assert_eq!(c.recv(&mut buf), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(c.recv(&mut buf), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(c.recv(&mut buf), 0);
    }
}
