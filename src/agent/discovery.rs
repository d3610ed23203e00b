//! Candidate gathering: host candidates are immediate, server-reflexive
//! candidates are discovered by pacing STUN Binding requests at a STUN
//! server, one outstanding discovery started per Ta tick.
//!
//! Grounded in the teacher's `agent_gather.rs` (the STUN round-trip and
//! `XorMappedAddress` handling) and `util::get_xormapped_addr`, collapsed
//! from a `tokio::spawn`-per-candidate-type fan-out into a single paced list
//! driven by `Agent::handle_timeout`, since this core has no task runtime.

use std::collections::VecDeque;

use stun::agent::TransactionId;
use stun::message::{Getter, Message, BINDING_REQUEST};
use stun::xoraddr::XorMappedAddress;

use crate::address::NiceAddress;
use crate::candidate::Candidate;
use crate::stream::Stream;

use super::AgentEvent;

const INITIAL_RTO_MS: u64 = 500;
/// RFC 5389 §7.2.1 Rc: total STUN transactions attempted for one discovery,
/// including the initial request (7 = 1 initial + 6 retransmits).
const MAX_RETRANSMITS: u8 = 6;
/// RFC 5389 §7.2.1 Rm: multiple of the *original* RTO to wait, after the
/// last retransmission, before giving up on the discovery.
const FINAL_TIMEOUT_MULTIPLIER: u64 = 16;

struct CandidateDiscovery {
    stream_id: u64,
    component_id: u16,
    host_socket_ref: usize,
    host_addr: NiceAddress,
    server_addr: NiceAddress,
    pending_txid: Option<TransactionId>,
    next_tick_at: u64,
    retransmit_count: u8,
}

#[derive(Default)]
pub(crate) struct DiscoveryEngine {
    items: VecDeque<CandidateDiscovery>,
    done_emitted: bool,
}

/// One STUN Binding request this tick asked the host to send.
pub(crate) struct Transmit {
    pub stream_id: u64,
    pub component_id: u16,
    pub socket_ref: usize,
    pub dest: NiceAddress,
    pub bytes: Vec<u8>,
}

impl DiscoveryEngine {
    /// Registers a host candidate for server-reflexive discovery. Called
    /// exactly once, when the host candidate is created, per §4.2.
    pub(crate) fn add_host_candidate(
        &mut self,
        stream_id: u64,
        component_id: u16,
        host_socket_ref: usize,
        host_addr: NiceAddress,
        server_addr: NiceAddress,
        now_ms: u64,
    ) {
        self.items.push_back(CandidateDiscovery {
            stream_id,
            component_id,
            host_socket_ref,
            host_addr,
            server_addr,
            pending_txid: None,
            next_tick_at: now_ms,
            retransmit_count: 0,
        });
        self.done_emitted = false;
    }

    pub(crate) fn has_pending_for_stream(&self, stream_id: u64) -> bool {
        self.items.iter().any(|i| i.stream_id == stream_id)
    }

    fn build_request(txid: TransactionId) -> Vec<u8> {
        let mut msg = Message::new();
        let _ = msg.build(&[Box::new(BINDING_REQUEST), Box::new(txid)]);
        msg.raw
    }

    /// Runs one pacing tick: resend any due retransmits, then start at most
    /// one new discovery. Returns the next deadline (ms since epoch) this
    /// engine needs to be ticked again.
    pub(crate) fn tick(
        &mut self,
        now_ms: u64,
        events: &mut VecDeque<AgentEvent>,
        transmits: &mut Vec<Transmit>,
    ) -> Option<u64> {
        let mut abandoned = Vec::new();
        for (idx, item) in self.items.iter_mut().enumerate() {
            if item.pending_txid.is_some() && item.next_tick_at <= now_ms {
                if item.retransmit_count >= MAX_RETRANSMITS {
                    abandoned.push(idx);
                    continue;
                }
                let txid = item.pending_txid.expect("checked is_some above");
                transmits.push(Transmit {
                    stream_id: item.stream_id,
                    component_id: item.component_id,
                    socket_ref: item.host_socket_ref,
                    dest: item.server_addr,
                    bytes: Self::build_request(txid),
                });
                item.retransmit_count += 1;
                let next_wait = if item.retransmit_count < MAX_RETRANSMITS {
                    INITIAL_RTO_MS << item.retransmit_count
                } else {
                    INITIAL_RTO_MS * FINAL_TIMEOUT_MULTIPLIER
                };
                item.next_tick_at = now_ms + next_wait;
            }
        }
        for idx in abandoned.into_iter().rev() {
            self.items.remove(idx);
        }

        if let Some(idx) = self
            .items
            .iter()
            .position(|i| i.pending_txid.is_none() && i.next_tick_at <= now_ms)
        {
            let txid = TransactionId::new();
            let item = &mut self.items[idx];
            item.pending_txid = Some(txid);
            item.next_tick_at = now_ms + INITIAL_RTO_MS;
            transmits.push(Transmit {
                stream_id: item.stream_id,
                component_id: item.component_id,
                socket_ref: item.host_socket_ref,
                dest: item.server_addr,
                bytes: Self::build_request(txid),
            });
        }

        if self.items.is_empty() && !self.done_emitted {
            self.done_emitted = true;
            events.push_back(AgentEvent::CandidateGatheringDone);
        }

        self.items.iter().map(|i| i.next_tick_at).min()
    }

    pub(crate) fn find_by_txid(&self, txid: TransactionId) -> Option<usize> {
        self.items.iter().position(|i| i.pending_txid == Some(txid))
    }

    /// Completes a discovery on STUN Binding success, producing the new
    /// server-reflexive candidate if the mapped address differs from the
    /// host's own.
    pub(crate) fn handle_success(
        &mut self,
        idx: usize,
        mapped: NiceAddress,
    ) -> (u64, u16, Option<Candidate>) {
        let item = self.items.remove(idx).expect("idx came from find_by_txid");
        let candidate = if mapped != item.host_addr {
            Some(Candidate::server_reflexive(
                item.component_id,
                mapped,
                item.host_addr,
                &item.server_addr,
                item.host_socket_ref,
            ))
        } else {
            None
        };
        (item.stream_id, item.component_id, candidate)
    }

    /// Drops a discovery whose transaction errored; per §4.2 this is
    /// absorbed silently.
    pub(crate) fn handle_error(&mut self, idx: usize) {
        self.items.remove(idx);
    }
}

pub(crate) fn xor_mapped_address(msg: &Message) -> Option<NiceAddress> {
    let mut addr = XorMappedAddress::default();
    addr.get_from(msg).ok()?;
    Some(NiceAddress::new(addr.ip, addr.port))
}

pub(crate) fn find_host_for_discovery(stream: &Stream, component_id: u16) -> Option<(usize, NiceAddress)> {
    stream.component(component_id).and_then(|c| {
        c.local_candidates
            .iter()
            .find(|cand| cand.candidate_type == crate::candidate::CandidateType::Host)
            .map(|cand| (cand.socket_ref, cand.addr))
    })
}

#[cfg(test)]
mod discovery_test {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> NiceAddress {
        NiceAddress::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn test_tick_starts_one_discovery_and_schedules_retransmit() {
        let mut engine = DiscoveryEngine::default();
        engine.add_host_candidate(1, 1, 0, addr(4000), addr(3478), 0);
        let mut events = VecDeque::new();
        let mut transmits = Vec::new();
        let next = engine.tick(0, &mut events, &mut transmits);
        assert_eq!(transmits.len(), 1);
        assert_eq!(next, Some(INITIAL_RTO_MS));
        assert!(events.is_empty());
    }

    #[test]
    fn test_gathering_done_emitted_once_items_drain() {
        let mut engine = DiscoveryEngine::default();
        let mut events = VecDeque::new();
        let mut transmits = Vec::new();
        engine.tick(0, &mut events, &mut transmits);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AgentEvent::CandidateGatheringDone));
        // A second tick with nothing outstanding must not emit it again.
        let mut events2 = VecDeque::new();
        engine.tick(1, &mut events2, &mut transmits);
        assert!(events2.is_empty());
    }

    #[test]
    fn test_success_with_differing_mapped_address_yields_candidate() {
        let mut engine = DiscoveryEngine::default();
        engine.add_host_candidate(1, 1, 0, addr(4000), addr(3478), 0);
        let mut events = VecDeque::new();
        let mut transmits = Vec::new();
        engine.tick(0, &mut events, &mut transmits);
        let txid = engine.items[0].pending_txid.unwrap();
        let idx = engine.find_by_txid(txid).unwrap();
        let (_stream_id, _component_id, candidate) = engine.handle_success(idx, addr(55555));
        assert!(candidate.is_some());
    }

    #[test]
    fn test_abandons_after_max_retransmits() {
        let mut engine = DiscoveryEngine::default();
        engine.add_host_candidate(1, 1, 0, addr(4000), addr(3478), 0);
        let mut now = 1u64;
        let mut events = VecDeque::new();
        let mut transmits = Vec::new();
        engine.tick(now, &mut events, &mut transmits);
        for _ in 0..=MAX_RETRANSMITS {
            now = engine.items[0].next_tick_at;
            engine.tick(now, &mut events, &mut transmits);
        }
        assert!(engine.items.is_empty());
    }
}
