//! The top-level coordinator: owns streams, the tie-breaker, the controlling
//! role, and the discovery/connectivity-check engines; emits observable
//! events and exposes the sans-I/O re-entry points a host event loop drives.
//!
//! Grounded in the teacher's `agent/mod.rs` and `agent_internal.rs` (the
//! `Agent`-owns-everything shape, tie-breaker generation, role storage), but
//! collapsed from `Arc<Mutex<AgentInternal>>` plus `tokio::spawn`ed
//! selector/gather tasks into a single owned struct driven synchronously by
//! `handle_timeout`/`handle_datagram`, since this core has no task runtime
//! (see `SPEC_FULL.md` §4.1's "Driver capability" re-expression, internal to
//! this workspace's design notes, not part of the public surface).

pub mod config;
pub(crate) mod conncheck;
pub(crate) mod discovery;
pub(crate) mod receive;

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};

use stun::message::Message;

use crate::address::NiceAddress;
use crate::candidate::Candidate;
use crate::component::ComponentState;
use crate::error::{Error, Result};
use crate::pair::CandidatePairState;
use crate::rand::generate_tie_breaker;
use crate::stats::{CandidatePairStats, CandidateStats};
use crate::stream::{Stream, StreamId};

pub use config::AgentConfig;
use conncheck::{ConnCheckEngine, RoleConflictOutcome};
use discovery::DiscoveryEngine;
use receive::Classification;

use crate::socket::SocketFactory;

/// One observable side effect of the agent's state machine, drained via
/// `poll_event`. One variant per signal in the core design (§4.1): this
/// replaces the teacher's per-signal `Box<dyn FnMut>` handler table with a
/// single ordered queue.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    CandidateGatheringDone,
    NewCandidate(StreamId, u16, String),
    NewRemoteCandidate(StreamId, u16, String),
    ComponentStateChanged(StreamId, u16, ComponentState),
    NewSelectedPair(StreamId, u16, String, String),
    InitialBindingRequestReceived(StreamId),
}

pub struct Agent {
    config: AgentConfig,
    socket_factory: Box<dyn SocketFactory>,
    local_addrs: Vec<IpAddr>,
    streams: Vec<Stream>,
    next_stream_id: u64,
    controlling: bool,
    tie_breaker: u64,
    discovery: DiscoveryEngine,
    conncheck: ConnCheckEngine,
    events: VecDeque<AgentEvent>,
}

impl Agent {
    #[must_use]
    pub fn new(socket_factory: Box<dyn SocketFactory>, config: AgentConfig) -> Self {
        let config = config.init_with_defaults();
        let controlling = config.controlling_mode;
        Self {
            config,
            socket_factory,
            local_addrs: Vec::new(),
            streams: Vec::new(),
            next_stream_id: 0,
            controlling,
            tie_breaker: generate_tie_breaker(),
            discovery: DiscoveryEngine::default(),
            conncheck: ConnCheckEngine::default(),
            events: VecDeque::new(),
        }
    }

    /// Registers a local interface address the agent may bind host
    /// candidates on. Must be called at least once before `add_stream`.
    pub fn add_local_address(&mut self, addr: IpAddr) {
        if !self.local_addrs.contains(&addr) {
            self.local_addrs.push(addr);
        }
    }

    fn stream_mut(&mut self, stream_id: StreamId) -> Result<&mut Stream> {
        self.streams
            .iter_mut()
            .find(|s| s.id == stream_id)
            .ok_or(Error::ErrUnknownStream(stream_id))
    }

    fn stream(&self, stream_id: StreamId) -> Result<&Stream> {
        self.streams
            .iter()
            .find(|s| s.id == stream_id)
            .ok_or(Error::ErrUnknownStream(stream_id))
    }

    /// Creates a new stream with `component_count` components, binding one
    /// host-candidate socket per registered local address per component.
    /// Rolled back atomically on bind failure: on error, no partial stream
    /// is left registered.
    pub fn add_stream(&mut self, component_count: u16) -> Result<StreamId> {
        if self.local_addrs.is_empty() {
            return Err(Error::ErrNoLocalAddress);
        }
        if !self.config.full_mode && self.config.stun_server.is_some() {
            return Err(Error::ErrLiteNonHostCandidate);
        }

        let stream_id = self.next_stream_id;
        let mut stream = Stream::new(stream_id, component_count);

        for component in &mut stream.components {
            for &ip in &self.local_addrs {
                let socket = self
                    .socket_factory
                    .bind(SocketAddr::new(ip, 0))
                    .map_err(|e| Error::ErrSocketBind(stream_id, component.id, e))?;
                let local_addr = NiceAddress::from(socket.local_addr());
                let socket_ref = component.sockets.len();
                component.sockets.push(socket);
                let candidate = Candidate::host(component.id, local_addr, socket_ref);
                component.local_candidates.push(candidate);
            }
            component.transition_to(ComponentState::Gathering);
        }

        self.next_stream_id += 1;
        let stun_server = self.config.stun_server.map(|ip| {
            NiceAddress::new(ip, self.config.stun_server_port)
        });
        if let Some(server_addr) = stun_server {
            for component in &stream.components {
                if let Some((socket_ref, host_addr)) =
                    discovery::find_host_for_discovery(&stream, component.id)
                {
                    self.discovery.add_host_candidate(
                        stream_id,
                        component.id,
                        socket_ref,
                        host_addr,
                        server_addr,
                        0,
                    );
                }
            }
        }
        for component in &stream.components {
            self.events.push_back(AgentEvent::NewCandidate(
                stream_id,
                component.id,
                component
                    .local_candidates
                    .first()
                    .map(|c| c.foundation.clone())
                    .unwrap_or_default(),
            ));
        }

        self.streams.push(stream);
        Ok(stream_id)
    }

    /// Removes a stream and all its timers/sockets/in-flight state.
    /// Responses for transactions belonging to the removed stream that
    /// arrive afterward are silently dropped (§5 cancellation guarantee).
    pub fn remove_stream(&mut self, stream_id: StreamId) {
        self.streams.retain(|s| s.id != stream_id);
    }

    /// Validates and stores the remote peer's credentials, per RFC 8445
    /// length floors (ufrag 4-256 chars, pwd 22-256 chars).
    pub fn set_remote_credentials(
        &mut self,
        stream_id: StreamId,
        ufrag: impl Into<String>,
        pwd: impl Into<String>,
    ) -> Result<()> {
        let ufrag = ufrag.into();
        let pwd = pwd.into();
        if !(4..=256).contains(&ufrag.len()) {
            return Err(Error::ErrRemoteUfragLength);
        }
        if !(22..=256).contains(&pwd.len()) {
            return Err(Error::ErrRemotePwdLength);
        }
        let stream = self.stream_mut(stream_id)?;
        stream.remote_ufrag = Some(ufrag);
        stream.remote_password = Some(pwd);
        Ok(())
    }

    pub fn get_local_credentials(&self, stream_id: StreamId) -> Result<(String, String)> {
        let stream = self.stream(stream_id)?;
        let (ufrag, pwd) = stream.local_credentials();
        Ok((ufrag.to_string(), pwd.to_string()))
    }

    /// Adds one remote candidate and reforms the affected component's check
    /// list.
    pub fn add_remote_candidate(
        &mut self,
        stream_id: StreamId,
        component_id: u16,
        candidate: Candidate,
    ) -> Result<()> {
        let controlling = self.controlling;
        let stream = self
            .streams
            .iter_mut()
            .find(|s| s.id == stream_id)
            .ok_or(Error::ErrUnknownStream(stream_id))?;
        let component = stream
            .component_mut(component_id)
            .ok_or(Error::ErrUnknownComponent(component_id, stream_id))?;
        if !component
            .remote_candidates
            .iter()
            .any(|c| c.same_transport_address(&candidate))
        {
            component.remote_candidates.push(candidate);
        }
        self.conncheck.reform_check_list(stream, component_id, controlling);
        Ok(())
    }

    /// Replaces the full remote candidate set for a component and reforms
    /// its check list. Idempotent: calling this twice with the same list
    /// leaves the check list structurally identical (§8).
    pub fn set_remote_candidates(
        &mut self,
        stream_id: StreamId,
        component_id: u16,
        candidates: Vec<Candidate>,
    ) -> Result<usize> {
        let controlling = self.controlling;
        let stream = self
            .streams
            .iter_mut()
            .find(|s| s.id == stream_id)
            .ok_or(Error::ErrUnknownStream(stream_id))?;
        let component = stream
            .component_mut(component_id)
            .ok_or(Error::ErrUnknownComponent(component_id, stream_id))?;
        component.remote_candidates = candidates;
        let count = component.remote_candidates.len();
        self.conncheck.reform_check_list(stream, component_id, controlling);
        Ok(count)
    }

    /// Sends application bytes on the component's currently selected pair.
    pub fn send(&mut self, stream_id: StreamId, component_id: u16, buf: &[u8]) -> Result<usize> {
        let stream = self.stream_mut(stream_id)?;
        let component = stream
            .component_mut(component_id)
            .ok_or(Error::ErrUnknownComponent(component_id, stream_id))?;
        let pair = component
            .selected_pair
            .as_ref()
            .ok_or(Error::ErrNoSocket(stream_id, component_id))?;
        let socket = component
            .sockets
            .get(pair.local.socket_ref)
            .ok_or(Error::ErrNoSocket(stream_id, component_id))?;
        let n = socket
            .send(pair.remote.addr.into(), buf)
            .map_err(Error::ErrSend)?;
        component.bytes_sent += n as u64;
        Ok(n)
    }

    /// Pops the oldest queued application datagram for this component, if
    /// any. Returns 0 if nothing is queued.
    pub fn recv(&mut self, stream_id: StreamId, component_id: u16, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream_mut(stream_id)?;
        let component = stream
            .component_mut(component_id)
            .ok_or(Error::ErrUnknownComponent(component_id, stream_id))?;
        Ok(component.recv(buf))
    }

    /// Runs one pacing tick across discovery and connectivity checks.
    /// Returns the next deadline (ms since the agent's epoch) the host
    /// should call this again by, if any work remains outstanding.
    pub fn handle_timeout(&mut self, now_ms: u64) -> Option<u64> {
        let mut discovery_transmits = Vec::new();
        let discovery_deadline = self.discovery.tick(now_ms, &mut self.events, &mut discovery_transmits);
        for t in discovery_transmits {
            self.send_raw(t.stream_id, t.component_id, t.socket_ref, t.dest, &t.bytes);
        }

        let mut conncheck_transmits = Vec::new();
        let conncheck_deadline = self.conncheck.tick(
            &mut self.streams,
            self.controlling,
            self.config.full_mode,
            self.tie_breaker,
            u64::from(self.config.keepalive_secs) * 1000,
            now_ms,
            &self.discovery,
            &mut self.events,
            &mut conncheck_transmits,
        );
        for t in conncheck_transmits {
            self.send_raw(t.stream_id, t.component_id, t.socket_ref, t.dest, &t.bytes);
        }

        for stream in &mut self.streams {
            for component in &mut stream.components {
                component.media_after_tick = false;
            }
        }

        match (discovery_deadline, conncheck_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Feeds one inbound datagram, delivered on the socket belonging to
    /// `(stream_id, component_id)`, through the receive-path classifier.
    pub fn handle_datagram(
        &mut self,
        stream_id: StreamId,
        component_id: u16,
        source: NiceAddress,
        bytes: &[u8],
    ) {
        match receive::classify(bytes) {
            Classification::Media | Classification::PassThrough => {
                if let Ok(stream) = self.stream_mut(stream_id) {
                    if let Some(component) = stream.component_mut(component_id) {
                        component.media_after_tick = true;
                        component.push_inbound(bytes.to_vec());
                    }
                }
            }
            Classification::Stun => self.handle_stun_datagram(stream_id, component_id, source, bytes),
        }
    }

    fn handle_stun_datagram(&mut self, stream_id: StreamId, component_id: u16, source: NiceAddress, bytes: &[u8]) {
        let mut msg = Message::new();
        if msg.write(bytes).is_err() {
            log::debug!("dropping malformed STUN datagram");
            return;
        }

        if let Some(idx) = self.discovery.find_by_txid(msg.transaction_id) {
            if msg.typ == stun::message::BINDING_SUCCESS {
                let mapped = discovery::xor_mapped_address(&msg);
                let (sid, cid, candidate) = self.discovery.handle_success(idx, mapped.unwrap_or(source));
                if let Some(candidate) = candidate {
                    let added = self
                        .streams
                        .iter_mut()
                        .find(|s| s.id == sid)
                        .and_then(|s| s.component_mut(cid))
                        .map(|component| {
                            if component
                                .local_candidates
                                .iter()
                                .any(|c| c.same_transport_address(&candidate))
                            {
                                false
                            } else {
                                component.local_candidates.push(candidate.clone());
                                true
                            }
                        })
                        .unwrap_or(false);
                    if added {
                        self.events
                            .push_back(AgentEvent::NewCandidate(sid, cid, candidate.foundation.clone()));
                        let controlling = self.controlling;
                        if let Some(stream) = self.streams.iter_mut().find(|s| s.id == sid) {
                            self.conncheck.reform_check_list(stream, cid, controlling);
                        }
                    }
                }
            } else {
                self.discovery.handle_error(idx);
            }
            return;
        }

        let mut stun_transmits = Vec::new();
        if let Some(stream) = self.streams.iter_mut().find(|s| s.id == stream_id) {
            self.conncheck.handle_datagram(
                stream,
                component_id,
                source,
                &mut msg,
                &mut self.controlling,
                self.tie_breaker,
                0,
                &mut self.events,
                &mut stun_transmits,
            );
        }
        for t in stun_transmits {
            self.send_raw(t.stream_id, t.component_id, t.socket_ref, t.dest, &t.bytes);
        }
    }

    /// Pops the next pending event, if any, in emission order.
    pub fn poll_event(&mut self) -> Option<AgentEvent> {
        self.events.pop_front()
    }

    fn send_raw(&mut self, stream_id: StreamId, component_id: u16, socket_ref: usize, dest: NiceAddress, bytes: &[u8]) {
        let Ok(stream) = self.stream_mut(stream_id) else {
            return;
        };
        let Some(component) = stream.component_mut(component_id) else {
            return;
        };
        let Some(socket) = component.sockets.get(socket_ref) else {
            return;
        };
        match socket.send(dest.into(), bytes) {
            Ok(n) => component.bytes_sent += n as u64,
            Err(e) => log::warn!("transmit failed for stream {stream_id} component {component_id}: {e}"),
        }
    }

    /// RFC 5245 §7.1.2.2: the agent with the numerically larger tie-breaker
    /// keeps its role. Returns `true` if this agent would keep its current
    /// role against a peer announcing `peer_tie_breaker`.
    #[must_use]
    pub fn resolve_role_conflict(&self, peer_tie_breaker: u64) -> bool {
        matches!(
            ConnCheckEngine::resolve_role_conflict(self.tie_breaker, peer_tie_breaker, self.controlling),
            RoleConflictOutcome::KeepRole
        )
    }

    #[must_use]
    pub fn is_controlling(&self) -> bool {
        self.controlling
    }

    pub fn candidate_pair_stats(&self, stream_id: StreamId) -> Result<Vec<CandidatePairStats>> {
        let stream = self.stream(stream_id)?;
        Ok(stream
            .check_list
            .iter()
            .map(|pair| {
                let requests_sent = if matches!(
                    pair.state,
                    CandidatePairState::Frozen | CandidatePairState::Waiting
                ) {
                    0
                } else {
                    u64::from(pair.retransmit_count) + 1
                };
                CandidatePairStats {
                    local_foundation: pair.local.foundation.clone(),
                    remote_foundation: pair.remote.foundation.clone(),
                    state: pair.state,
                    nominated: pair.nominated,
                    priority: pair.priority,
                    requests_sent,
                    responses_received: u64::from(pair.state == CandidatePairState::Succeeded),
                }
            })
            .collect())
    }

    pub fn local_candidate_stats(&self, stream_id: StreamId) -> Result<Vec<CandidateStats>> {
        let stream = self.stream(stream_id)?;
        Ok(stream
            .components
            .iter()
            .flat_map(|c| c.local_candidates.iter().map(CandidateStats::from))
            .collect())
    }
}

#[cfg(test)]
mod agent_test {
    use super::*;
    use crate::socket::test_support::{loopback, NextPortFactory};

    fn new_agent(controlling: bool) -> Agent {
        let mut agent = Agent::new(
            Box::new(NextPortFactory::starting_at(4000)),
            AgentConfig {
                controlling_mode: controlling,
                ..Default::default()
            },
        );
        agent.add_local_address(loopback());
        agent
    }

    #[test]
    fn test_add_stream_creates_host_candidates_and_gathering_state() {
        let mut agent = new_agent(true);
        let stream_id = agent.add_stream(1).unwrap();
        let stream = agent.stream(stream_id).unwrap();
        assert_eq!(stream.components.len(), 1);
        assert_eq!(stream.components[0].local_candidates.len(), 1);
        assert_eq!(stream.components[0].state, ComponentState::Gathering);
    }

    #[test]
    fn test_add_stream_without_local_address_errors() {
        let mut agent = Agent::new(Box::new(NextPortFactory::starting_at(4000)), AgentConfig::default());
        assert!(matches!(agent.add_stream(1), Err(Error::ErrNoLocalAddress)));
    }

    #[test]
    fn test_set_remote_credentials_rejects_short_ufrag() {
        let mut agent = new_agent(true);
        let stream_id = agent.add_stream(1).unwrap();
        assert!(matches!(
            agent.set_remote_credentials(stream_id, "ab", "0123456789012345678901"),
            Err(Error::ErrRemoteUfragLength)
        ));
    }

    #[test]
    fn test_unknown_stream_id_is_reported() {
        let mut agent = new_agent(true);
        assert!(matches!(
            agent.set_remote_credentials(99, "validufrag", "0123456789012345678901"),
            Err(Error::ErrUnknownStream(99))
        ));
    }

    #[test]
    fn test_role_conflict_resolution_matches_tie_breaker_rule() {
        let agent = new_agent(true);
        // Whatever tie-breaker this agent generated, a peer announcing
        // u64::MAX always outranks it (ties aside, vanishingly unlikely here).
        assert!(!agent.resolve_role_conflict(u64::MAX));
    }

    #[test]
    fn test_remote_candidate_forms_check_list_and_first_tick_goes_in_progress() {
        let mut agent = new_agent(true);
        let stream_id = agent.add_stream(1).unwrap();
        agent
            .set_remote_credentials(stream_id, "remoteufragremote", "0123456789012345678901")
            .unwrap();

        let remote = Candidate::host(
            1,
            NiceAddress::new(loopback(), 5000),
            0,
        );
        agent.add_remote_candidate(stream_id, 1, remote).unwrap();
        assert_eq!(agent.stream(stream_id).unwrap().check_list.len(), 1);
        assert_eq!(
            agent.stream(stream_id).unwrap().check_list[0].state,
            CandidatePairState::Waiting
        );

        agent.handle_timeout(20);
        assert_eq!(
            agent.stream(stream_id).unwrap().check_list[0].state,
            CandidatePairState::InProgress
        );
        assert_eq!(
            agent.stream(stream_id).unwrap().components[0].state,
            ComponentState::Connecting
        );
    }

    #[test]
    fn test_set_remote_candidates_is_idempotent() {
        let mut agent = new_agent(true);
        let stream_id = agent.add_stream(1).unwrap();
        agent
            .set_remote_credentials(stream_id, "remoteufragremote", "0123456789012345678901")
            .unwrap();
        let remote = Candidate::host(1, NiceAddress::new(loopback(), 5000), 0);

        agent
            .set_remote_candidates(stream_id, 1, vec![remote.clone()])
            .unwrap();
        let first: Vec<_> = agent
            .stream(stream_id)
            .unwrap()
            .check_list
            .iter()
            .map(|p| (p.local.addr, p.remote.addr, p.priority))
            .collect();

        agent.set_remote_candidates(stream_id, 1, vec![remote]).unwrap();
        let second: Vec<_> = agent
            .stream(stream_id)
            .unwrap()
            .check_list
            .iter()
            .map(|p| (p.local.addr, p.remote.addr, p.priority))
            .collect();

        assert_eq!(first, second);
    }
}
