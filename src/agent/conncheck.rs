//! The connectivity-check state machine: check-list formation, pacing,
//! STUN Binding request/response handling, triggered checks, nomination,
//! role-conflict resolution and keepalives.
//!
//! Grounded in the teacher's `agent_selector.rs` (the controlling/controlled
//! selector split, the STUN attribute set on outgoing checks, username/
//! integrity conventions) and `candidate_pair.rs`'s ordering, collapsed from
//! the teacher's `Arc<Mutex<..>>`-guarded, tokio-scheduled selectors into a
//! plain synchronous engine driven by `Agent::handle_timeout`.
//!
//! Nomination uses the "aggressive" strategy named as an implementation
//! choice in the check-list design: the controlling agent sets USE-CANDIDATE
//! on every ordinary check it sends, rather than waiting out a stabilisation
//! window. This trades a small amount of redundant nomination traffic for
//! not needing a second timer dimension, and is recorded as an Open Question
//! decision in `DESIGN.md`.

use std::collections::{HashMap, VecDeque};

use stun::agent::TransactionId;
use stun::error_code::{ErrorCodeAttribute, CODE_ROLE_CONFLICT};
use stun::integrity::MessageIntegrity;
use stun::message::{Getter, Message, MessageType, CLASS_ERROR_RESPONSE, CLASS_INDICATION};
use stun::message::{BINDING_ERROR, BINDING_REQUEST, BINDING_SUCCESS};
use stun::textattrs::Username;
use stun::xoraddr::XorMappedAddress;

use crate::address::NiceAddress;
use crate::candidate::{Candidate, CandidateType};
use crate::component::ComponentState;
use crate::pair::{pair_priority, CandidatePair, CandidatePairState};
use crate::stream::Stream;
use crate::stun_attrs::{AttrControlled, AttrControlling, PriorityAttr, UseCandidateAttr};

use super::discovery::DiscoveryEngine;
use super::AgentEvent;

const INITIAL_RTO_MS: u64 = 500;
/// RFC 5389 §7.2.1 Rc: total STUN transactions attempted for one check,
/// including the initial request (7 = 1 initial + 6 retransmits).
const MAX_RETRANSMITS: u8 = 6;
/// RFC 5389 §7.2.1 Rm: multiple of the *original* RTO to wait, after the
/// last retransmission, before giving up on the transaction.
const FINAL_TIMEOUT_MULTIPLIER: u64 = 16;
const MAX_PAIRS_PER_STREAM: usize = 100;

pub(crate) struct Transmit {
    pub stream_id: u64,
    pub component_id: u16,
    pub socket_ref: usize,
    pub dest: NiceAddress,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct ConnCheckEngine {
    last_keepalive_ms: HashMap<(u64, u16), u64>,
    /// Round-robin cursor over streams so pacing picks a different stream
    /// first each tick instead of starving later ones.
    next_stream_cursor: usize,
}

impl ConnCheckEngine {
    /// Rebuilds `stream`'s check list for one component from scratch: forms
    /// every compatible pair, prunes redundant ones, sorts by priority, and
    /// assigns initial FROZEN/WAITING states by foundation grouping. Safe to
    /// call repeatedly (§8 idempotence): the same candidate sets always
    /// yield the same check list.
    pub(crate) fn reform_check_list(&self, stream: &mut Stream, component_id: u16, controlling: bool) {
        let Some(component) = stream.component(component_id) else {
            return;
        };
        let locals: Vec<Candidate> = component.local_candidates.clone();
        let remotes: Vec<Candidate> = component.remote_candidates.clone();

        stream
            .check_list
            .retain(|p| p.local.component_id != component_id);

        let mut best: HashMap<(NiceAddress, NiceAddress), CandidatePair> = HashMap::new();
        for local in &locals {
            for remote in &remotes {
                if !local.addr.same_family(&remote.addr) {
                    continue;
                }
                let id = stream.next_pair_id();
                let pair = CandidatePair::new(id, local.clone(), remote.clone(), controlling);
                let key = (local.base_addr, remote.addr);
                match best.get(&key) {
                    Some(existing) if existing.priority >= pair.priority => {}
                    _ => {
                        best.insert(key, pair);
                    }
                }
            }
        }

        let mut pairs: Vec<CandidatePair> = best.into_values().collect();
        pairs.sort_by(|a, b| b.priority.cmp(&a.priority));
        pairs.truncate(MAX_PAIRS_PER_STREAM);

        let mut foundation_started: std::collections::HashSet<String> = std::collections::HashSet::new();
        for pair in &mut pairs {
            let foundation = pair.local.foundation.clone();
            if foundation_started.contains(&foundation) {
                pair.state = CandidatePairState::Frozen;
            } else {
                pair.state = CandidatePairState::Waiting;
                foundation_started.insert(foundation);
            }
        }

        stream.check_list.extend(pairs);
    }

    /// Recomputes pair priorities and re-sorts after a role flip.
    pub(crate) fn recompute_priorities(&self, stream: &mut Stream, controlling: bool) {
        for pair in &mut stream.check_list {
            pair.recompute_priority(controlling);
        }
        stream.check_list.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    fn build_request(
        txid: TransactionId,
        username: String,
        priority: u32,
        controlling: bool,
        tie_breaker: u64,
        use_candidate: bool,
        remote_password: String,
    ) -> Vec<u8> {
        let mut msg = Message::new();
        let mut setters: Vec<Box<dyn stun::message::Setter>> = vec![
            Box::new(BINDING_REQUEST),
            Box::new(txid),
            Box::new(Username::new(stun::attributes::ATTR_USERNAME, username)),
            Box::new(PriorityAttr(priority)),
        ];
        if controlling {
            setters.push(Box::new(AttrControlling(tie_breaker)));
        } else {
            setters.push(Box::new(AttrControlled(tie_breaker)));
        }
        if use_candidate {
            setters.push(Box::<UseCandidateAttr>::default());
        }
        setters.push(Box::new(MessageIntegrity::new_short_term_integrity(
            remote_password,
        )));
        setters.push(Box::new(stun::fingerprint::FINGERPRINT));
        let _ = msg.build(&setters);
        msg.raw
    }

    fn build_success(txid: TransactionId, mapped: NiceAddress, local_password: String) -> Vec<u8> {
        let mut msg = Message::new();
        let addr = XorMappedAddress {
            ip: mapped.ip(),
            port: mapped.port(),
        };
        let setters: Vec<Box<dyn stun::message::Setter>> = vec![
            Box::new(BINDING_SUCCESS),
            Box::new(txid),
            Box::new(addr),
            Box::new(MessageIntegrity::new_short_term_integrity(local_password)),
            Box::new(stun::fingerprint::FINGERPRINT),
        ];
        let _ = msg.build(&setters);
        msg.raw
    }

    fn build_role_conflict_error(txid: TransactionId, local_password: String) -> Vec<u8> {
        let mut msg = Message::new();
        let setters: Vec<Box<dyn stun::message::Setter>> = vec![
            Box::new(BINDING_ERROR),
            Box::new(txid),
            Box::new(CODE_ROLE_CONFLICT),
            Box::new(MessageIntegrity::new_short_term_integrity(local_password)),
        ];
        let _ = msg.build(&setters);
        msg.raw
    }

    fn build_indication(txid: TransactionId) -> Vec<u8> {
        let mut msg = Message::new();
        let indication = MessageType {
            method: stun::message::METHOD_BINDING,
            class: CLASS_INDICATION,
        };
        let _ = msg.build(&[Box::new(indication), Box::new(txid)]);
        msg.raw
    }

    /// Runs one pacing tick across every stream: resend due retransmits,
    /// start at most one new ordinary check, send any due keepalives.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tick(
        &mut self,
        streams: &mut [Stream],
        controlling: bool,
        full_mode: bool,
        tie_breaker: u64,
        keepalive_ms: u64,
        now_ms: u64,
        discovery: &DiscoveryEngine,
        events: &mut VecDeque<AgentEvent>,
        transmits: &mut Vec<Transmit>,
    ) -> Option<u64> {
        let mut next_deadline = None;
        let mut started_one = false;

        for stream in streams.iter_mut() {
            let (remote_ufrag, remote_pwd) = match (&stream.remote_ufrag, &stream.remote_password) {
                (Some(u), Some(p)) => (u.clone(), p.clone()),
                _ => continue,
            };
            let local_ufrag = stream.local_ufrag.clone();

            let mut failed_components = Vec::new();
            for pair in &mut stream.check_list {
                if pair.state != CandidatePairState::InProgress {
                    continue;
                }
                let Some(next_at) = pair.next_tick_at else {
                    continue;
                };
                if next_at > now_ms {
                    next_deadline = Some(next_deadline.map_or(next_at, |d: u64| d.min(next_at)));
                    continue;
                }
                if pair.retransmit_count >= MAX_RETRANSMITS {
                    pair.state = CandidatePairState::Failed;
                    failed_components.push(pair.local.component_id);
                    continue;
                }
                let txid = pair.last_txid.expect("in-progress pair always has a txid");
                let username = format!("{remote_ufrag}:{local_ufrag}");
                let use_candidate = controlling && full_mode;
                transmits.push(Transmit {
                    stream_id: stream.id,
                    component_id: pair.local.component_id,
                    socket_ref: pair.local.socket_ref,
                    dest: pair.remote.addr,
                    bytes: Self::build_request(
                        txid,
                        username,
                        pair.local.priority,
                        controlling,
                        tie_breaker,
                        use_candidate,
                        remote_pwd.clone(),
                    ),
                });
                pair.use_candidate_sent = use_candidate;
                pair.retransmit_count += 1;
                let next_wait = if pair.retransmit_count < MAX_RETRANSMITS {
                    INITIAL_RTO_MS << pair.retransmit_count
                } else {
                    INITIAL_RTO_MS * FINAL_TIMEOUT_MULTIPLIER
                };
                pair.next_tick_at = Some(now_ms + next_wait);
                next_deadline = Some(next_deadline.map_or(now_ms + next_wait, |d: u64| d.min(now_ms + next_wait)));
            }

            if full_mode && !started_one {
                if let Some(idx) = stream
                    .check_list
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.state == CandidatePairState::Waiting)
                    .max_by_key(|(_, p)| p.priority)
                    .map(|(i, _)| i)
                {
                    let txid = TransactionId::new();
                    let username = format!("{remote_ufrag}:{local_ufrag}");
                    {
                        let pair = &mut stream.check_list[idx];
                        pair.state = CandidatePairState::InProgress;
                        pair.last_txid = Some(txid);
                        pair.retransmit_count = 0;
                        pair.next_tick_at = Some(now_ms + INITIAL_RTO_MS);
                        let use_candidate = controlling && full_mode;
                        pair.use_candidate_sent = use_candidate;
                        transmits.push(Transmit {
                            stream_id: stream.id,
                            component_id: pair.local.component_id,
                            socket_ref: pair.local.socket_ref,
                            dest: pair.remote.addr,
                            bytes: Self::build_request(
                                txid,
                                username,
                                pair.local.priority,
                                controlling,
                                tie_breaker,
                                use_candidate,
                                remote_pwd.clone(),
                            ),
                        });
                    }
                    started_one = true;
                    next_deadline = Some(next_deadline.map_or(now_ms, |d: u64| d.min(now_ms)));
                    let started_component_id = stream.check_list[idx].local.component_id;
                    if let Some(component) = stream.component_mut(started_component_id) {
                        if component.transition_to(ComponentState::Connecting) {
                            events.push_back(AgentEvent::ComponentStateChanged(
                                stream.id,
                                started_component_id,
                                ComponentState::Connecting,
                            ));
                        }
                    }
                }
            }

            for component_id in failed_components {
                let all_failed = stream
                    .check_list
                    .iter()
                    .filter(|p| p.local.component_id == component_id)
                    .all(|p| p.state == CandidatePairState::Failed);
                let discovery_pending = discovery.has_pending_for_stream(stream.id);
                if all_failed && !discovery_pending {
                    if let Some(component) = stream.component_mut(component_id) {
                        if component.transition_to(ComponentState::Failed) {
                            events.push_back(AgentEvent::ComponentStateChanged(
                                stream.id,
                                component_id,
                                ComponentState::Failed,
                            ));
                        }
                    }
                }
            }

            for component in &mut stream.components {
                if component.state != ComponentState::Ready {
                    continue;
                }
                let key = (stream.id, component.id);
                let due = self
                    .last_keepalive_ms
                    .get(&key)
                    .is_none_or(|last| now_ms.saturating_sub(*last) >= keepalive_ms);
                if due {
                    if let Some(pair) = &component.selected_pair {
                        transmits.push(Transmit {
                            stream_id: stream.id,
                            component_id: component.id,
                            socket_ref: pair.local.socket_ref,
                            dest: pair.remote.addr,
                            bytes: Self::build_indication(TransactionId::new()),
                        });
                        self.last_keepalive_ms.insert(key, now_ms);
                    }
                    next_deadline =
                        Some(next_deadline.map_or(now_ms + keepalive_ms, |d| d.min(now_ms + keepalive_ms)));
                }
            }
        }

        next_deadline
    }

    /// Handles an inbound STUN message addressed to `(stream_id,
    /// component_id)` from `source`. Returns `true` if it was recognised and
    /// handled (success/error response, or a Binding request).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn handle_datagram(
        &mut self,
        stream: &mut Stream,
        component_id: u16,
        source: NiceAddress,
        msg: &mut Message,
        controlling: &mut bool,
        tie_breaker: u64,
        now_ms: u64,
        events: &mut VecDeque<AgentEvent>,
        transmits: &mut Vec<Transmit>,
    ) -> bool {
        if msg.typ == BINDING_SUCCESS || msg.typ == BINDING_ERROR {
            return self.handle_response(stream, msg, controlling, now_ms, events, transmits);
        }
        if msg.typ == BINDING_REQUEST {
            self.handle_request(
                stream,
                component_id,
                source,
                msg,
                controlling,
                tie_breaker,
                now_ms,
                events,
                transmits,
            );
            return true;
        }
        false
    }

    fn handle_response(
        &mut self,
        stream: &mut Stream,
        msg: &mut Message,
        controlling: &mut bool,
        now_ms: u64,
        events: &mut VecDeque<AgentEvent>,
        transmits: &mut Vec<Transmit>,
    ) -> bool {
        let Some(idx) = stream
            .check_list
            .iter()
            .position(|p| p.last_txid == Some(msg.transaction_id))
        else {
            log::warn!("discard STUN response with unknown transaction id");
            return false;
        };

        if msg.typ == BINDING_ERROR {
            let mut error = ErrorCodeAttribute::default();
            if error.get_from(msg).is_ok() && error.code == CODE_ROLE_CONFLICT {
                *controlling = !*controlling;
                self.recompute_priorities(stream, *controlling);
                if let Some(pair) = stream.check_list.get_mut(idx) {
                    pair.state = CandidatePairState::Waiting;
                    pair.last_txid = None;
                }
            } else {
                stream.check_list[idx].state = CandidatePairState::Failed;
            }
            return true;
        }

        let mut mapped = XorMappedAddress::default();
        if mapped.get_from(msg).is_err() {
            stream.check_list[idx].state = CandidatePairState::Failed;
            return true;
        }
        let mapped_addr = NiceAddress::new(mapped.ip, mapped.port);

        let expected_local = stream.check_list[idx].local.addr;
        if mapped_addr != expected_local {
            let synthesized_priority = stream.check_list[idx].local.priority;
            let base = stream.check_list[idx].local.base_addr;
            let component_id = stream.check_list[idx].local.component_id;
            let socket_ref = stream.check_list[idx].local.socket_ref;
            let new_local = Candidate::peer_reflexive(
                component_id,
                mapped_addr,
                base,
                Some(synthesized_priority),
                socket_ref,
            );
            if let Some(component) = stream.component_mut(component_id) {
                if !component
                    .local_candidates
                    .iter()
                    .any(|c| c.same_transport_address(&new_local))
                {
                    component.local_candidates.push(new_local.clone());
                    events.push_back(AgentEvent::NewCandidate(
                        stream.id,
                        component_id,
                        new_local.foundation.clone(),
                    ));
                }
            }
            stream.check_list[idx].local = new_local;
        }

        let foundation = stream.check_list[idx].local.foundation.clone();
        stream.check_list[idx].state = CandidatePairState::Succeeded;
        stream.check_list[idx].valid = true;
        for pair in &mut stream.check_list {
            if pair.local.foundation == foundation && pair.state == CandidatePairState::Frozen {
                pair.state = CandidatePairState::Waiting;
            }
        }

        let succeeded_component_id = stream.check_list[idx].local.component_id;
        if let Some(component) = stream.component_mut(succeeded_component_id) {
            if component.transition_to(ComponentState::Connected) {
                events.push_back(AgentEvent::ComponentStateChanged(
                    stream.id,
                    succeeded_component_id,
                    ComponentState::Connected,
                ));
            }
        }

        if *controlling && stream.check_list[idx].use_candidate_sent {
            self.maybe_nominate(stream, idx, now_ms, events);
        }
        true
    }

    fn maybe_nominate(
        &mut self,
        stream: &mut Stream,
        idx: usize,
        _now_ms: u64,
        events: &mut VecDeque<AgentEvent>,
    ) {
        let (component_id, already_selected) = {
            let pair = &stream.check_list[idx];
            let selected = stream
                .component(pair.local.component_id)
                .and_then(|c| c.selected_pair.as_ref())
                .is_some();
            (pair.local.component_id, selected)
        };
        if already_selected {
            return;
        }
        // Aggressive nomination: USE-CANDIDATE already rode on this check if
        // we are the controlling agent (set in `tick`); a success response
        // to such a check installs the pair immediately.
        stream.check_list[idx].nominated = true;
        let pair = stream.check_list[idx].clone();
        if let Some(component) = stream.component_mut(component_id) {
            component.selected_pair = Some(pair.clone());
            if component.transition_to(ComponentState::Ready) {
                events.push_back(AgentEvent::ComponentStateChanged(
                    stream.id,
                    component_id,
                    ComponentState::Ready,
                ));
            }
            events.push_back(AgentEvent::NewSelectedPair(
                stream.id,
                component_id,
                pair.local.foundation.clone(),
                pair.remote.foundation.clone(),
            ));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_request(
        &mut self,
        stream: &mut Stream,
        component_id: u16,
        source: NiceAddress,
        msg: &mut Message,
        controlling: &mut bool,
        tie_breaker: u64,
        now_ms: u64,
        events: &mut VecDeque<AgentEvent>,
        transmits: &mut Vec<Transmit>,
    ) {
        let expected_username = format!("{}:{}", stream.local_ufrag, stream.remote_ufrag.clone().unwrap_or_default());
        let mut username = stun::textattrs::Username::new(stun::attributes::ATTR_USERNAME, String::new());
        if username.get_from(msg).is_err() || username.text != expected_username {
            log::debug!("dropping STUN request with unexpected username");
            return;
        }
        let integrity = MessageIntegrity::new_short_term_integrity(stream.local_password.clone());
        if integrity.check(msg).is_err() {
            log::debug!("dropping STUN request that failed message integrity");
            return;
        }

        let txid = msg.transaction_id;
        let response_socket_ref = stream
            .component(component_id)
            .and_then(|c| c.selected_pair.as_ref().map(|p| p.local.socket_ref))
            .unwrap_or(0);

        let mut peer_controlling = AttrControlling::default();
        let mut peer_controlled = AttrControlled::default();
        let peer_role = if peer_controlling.get_from(msg).is_ok() {
            Some((true, peer_controlling.0))
        } else if peer_controlled.get_from(msg).is_ok() {
            Some((false, peer_controlled.0))
        } else {
            None
        };

        if let Some((peer_is_controlling, peer_tie_breaker)) = peer_role {
            if peer_is_controlling == *controlling {
                match Self::resolve_role_conflict(tie_breaker, peer_tie_breaker, *controlling) {
                    RoleConflictOutcome::KeepRole => {
                        log::debug!("role conflict with peer: keeping role, replying 487");
                        transmits.push(Transmit {
                            stream_id: stream.id,
                            component_id,
                            socket_ref: response_socket_ref,
                            dest: source,
                            bytes: Self::build_role_conflict_error(txid, stream.local_password.clone()),
                        });
                        return;
                    }
                    RoleConflictOutcome::SwitchTo(new_role) => {
                        log::debug!("role conflict with peer: switching to controlling={new_role}");
                        *controlling = new_role;
                        self.recompute_priorities(stream, *controlling);
                    }
                }
            }
        }

        transmits.push(Transmit {
            stream_id: stream.id,
            component_id,
            socket_ref: response_socket_ref,
            dest: source,
            bytes: Self::build_success(txid, source, stream.local_password.clone()),
        });

        if !stream.component(component_id).map(|c| c.has_host_candidate()).unwrap_or(false) {
            return;
        }

        let use_candidate = UseCandidateAttr::is_set(msg);

        let existing_idx = stream
            .check_list
            .iter()
            .position(|p| p.local.component_id == component_id && p.remote.addr == source);

        let idx = match existing_idx {
            Some(i) => i,
            None => {
                let mut priority_attr = PriorityAttr::default();
                let peer_priority = priority_attr.get_from(msg).map(|()| priority_attr.0).unwrap_or(0);
                let Some(local) = stream
                    .component(component_id)
                    .and_then(|c| c.local_candidates.first().cloned())
                else {
                    return;
                };
                let remote = Candidate::peer_reflexive(component_id, source, source, Some(peer_priority), 0)
                    .with_credentials(
                        stream.remote_ufrag.clone().unwrap_or_default(),
                        stream.remote_password.clone().unwrap_or_default(),
                    );
                events.push_back(AgentEvent::NewRemoteCandidate(
                    stream.id,
                    component_id,
                    remote.foundation.clone(),
                ));
                if let Some(component) = stream.component_mut(component_id) {
                    component.remote_candidates.push(remote.clone());
                }
                let id = stream.next_pair_id();
                let pair = CandidatePair::new(id, local, remote, *controlling);
                stream.check_list.push(pair);
                stream.check_list.len() - 1
            }
        };

        if !stream.initial_binding_request_received {
            stream.initial_binding_request_received = true;
            events.push_back(AgentEvent::InitialBindingRequestReceived(stream.id));
        }

        let pair_state = stream.check_list[idx].state;
        if matches!(
            pair_state,
            CandidatePairState::Succeeded | CandidatePairState::Failed | CandidatePairState::InProgress
        ) {
            if use_candidate && pair_state == CandidatePairState::Succeeded {
                self.maybe_nominate(stream, idx, now_ms, events);
            }
            return;
        }
        stream.check_list[idx].state = CandidatePairState::Waiting;
        stream.check_list[idx].next_tick_at = Some(now_ms);
    }

    /// RFC 5245 §7.1.2.2: the agent with the larger tie-breaker wins and
    /// keeps its role; the other must flip. Called when *we* detect a
    /// conflicting role announced by the peer in an inbound request's
    /// ICE-CONTROLLING/ICE-CONTROLLED attribute.
    pub(crate) fn resolve_role_conflict(
        our_tie_breaker: u64,
        peer_tie_breaker: u64,
        we_are_controlling: bool,
    ) -> RoleConflictOutcome {
        if our_tie_breaker >= peer_tie_breaker {
            RoleConflictOutcome::KeepRole
        } else if we_are_controlling {
            RoleConflictOutcome::SwitchTo(false)
        } else {
            RoleConflictOutcome::SwitchTo(true)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RoleConflictOutcome {
    KeepRole,
    SwitchTo(bool),
}

#[cfg(test)]
mod conncheck_test {
    use super::*;
    use crate::candidate::Candidate;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> NiceAddress {
        NiceAddress::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[test]
    fn test_reform_check_list_orders_by_priority_descending() {
        let mut stream = Stream::new(1, 1);
        stream.remote_ufrag = Some("ru".into());
        stream.remote_password = Some("rp".into());
        if let Some(c) = stream.component_mut(1) {
            c.local_candidates.push(Candidate::host(1, addr(4000), 0));
            c.remote_candidates.push(Candidate::host(1, addr(5000), 0));
            c.remote_candidates.push(Candidate::host(1, addr(5001), 1));
        }
        let engine = ConnCheckEngine::default();
        engine.reform_check_list(&mut stream, 1, true);
        assert!(!stream.check_list.is_empty());
        for w in stream.check_list.windows(2) {
            assert!(w[0].priority >= w[1].priority);
        }
    }

    #[test]
    fn test_only_one_waiting_pair_per_foundation_initially() {
        let mut stream = Stream::new(1, 1);
        if let Some(c) = stream.component_mut(1) {
            c.local_candidates.push(Candidate::host(1, addr(4000), 0));
            c.remote_candidates.push(Candidate::host(1, addr(5000), 0));
            c.remote_candidates.push(Candidate::host(1, addr(5001), 1));
        }
        let engine = ConnCheckEngine::default();
        engine.reform_check_list(&mut stream, 1, true);
        let waiting = stream
            .check_list
            .iter()
            .filter(|p| p.state == CandidatePairState::Waiting)
            .count();
        // Both remotes are host candidates with distinct foundations (different
        // base addr => different foundation), so both start WAITING.
        assert_eq!(waiting, stream.check_list.len());
    }

    #[test]
    fn test_role_conflict_keeps_larger_tie_breaker() {
        assert_eq!(
            ConnCheckEngine::resolve_role_conflict(10, 5, true),
            RoleConflictOutcome::KeepRole
        );
        assert_eq!(
            ConnCheckEngine::resolve_role_conflict(5, 10, true),
            RoleConflictOutcome::SwitchTo(false)
        );
    }
}
