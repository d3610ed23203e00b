use std::net::{IpAddr, Ipv4Addr};

use super::*;

fn addr(a: u8, b: u8, c: u8, d: u8, port: u16) -> NiceAddress {
    NiceAddress::new(IpAddr::V4(Ipv4Addr::new(a, b, c, d)), port)
}

#[test]
fn test_priority_formula_matches_rfc5245() {
    let p = compute_priority(CandidateType::Host, DEFAULT_LOCAL_PREFERENCE, 1);
    let expected = (126u32 << 24) + (u32::from(DEFAULT_LOCAL_PREFERENCE) << 8) + (256 - 1);
    assert_eq!(p, expected);
}

#[test]
fn test_host_candidate_base_equals_addr() {
    let c = Candidate::host(1, addr(10, 0, 0, 1, 4000), 0);
    assert_eq!(c.addr, c.base_addr);
    assert_eq!(c.candidate_type, CandidateType::Host);
}

#[test]
fn test_server_reflexive_base_is_host_addr() {
    let host_addr = addr(10, 0, 0, 1, 4000);
    let mapped = addr(203, 0, 113, 5, 4000);
    let server = addr(198, 51, 100, 1, 3478);
    let srflx = Candidate::server_reflexive(1, mapped, host_addr, &server, 0);
    assert_eq!(srflx.base_addr, host_addr);
    assert_eq!(srflx.addr, mapped);
    assert_eq!(srflx.candidate_type, CandidateType::ServerReflexive);
}

#[test]
fn test_foundation_is_stable_for_equivalent_candidates() {
    let host_addr = addr(10, 0, 0, 1, 4000);
    let server = addr(198, 51, 100, 1, 3478);
    let a = Candidate::server_reflexive(1, addr(1, 2, 3, 4, 1), host_addr, &server, 0);
    let b = Candidate::server_reflexive(2, addr(1, 2, 3, 4, 2), host_addr, &server, 0);
    // Same (type, base_addr, server) => same foundation even though port/component differ.
    assert_eq!(a.foundation, b.foundation);
    assert!(a.foundation.len() <= MAX_FOUNDATION_LEN);
}

#[test]
fn test_foundation_differs_across_stun_servers() {
    let host_addr = addr(10, 0, 0, 1, 4000);
    let server1 = addr(198, 51, 100, 1, 3478);
    let server2 = addr(198, 51, 100, 2, 3478);
    let a = Candidate::server_reflexive(1, addr(1, 2, 3, 4, 1), host_addr, &server1, 0);
    let b = Candidate::server_reflexive(1, addr(1, 2, 3, 4, 1), host_addr, &server2, 0);
    assert_ne!(a.foundation, b.foundation);
}

#[test]
fn test_peer_reflexive_uses_priority_echoed_by_peer() {
    let c = Candidate::peer_reflexive(1, addr(1, 1, 1, 1, 1), addr(1, 1, 1, 1, 1), Some(12345), 0);
    assert_eq!(c.priority, 12345);
}

#[test]
fn test_same_transport_address() {
    let a = Candidate::host(1, addr(10, 0, 0, 1, 4000), 0);
    let b = Candidate::host(1, addr(10, 0, 0, 1, 4000), 1);
    let c = Candidate::host(1, addr(10, 0, 0, 2, 4000), 0);
    assert!(a.same_transport_address(&b));
    assert!(!a.same_transport_address(&c));
}
