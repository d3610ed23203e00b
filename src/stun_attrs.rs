//! ICE-specific STUN attributes not provided by the `stun` crate itself.
//!
//! Ported from the teacher's `control/mod.rs` (ICE-CONTROLLING/ICE-CONTROLLED)
//! and `use_candidate/mod.rs` (USE-CANDIDATE), collapsed into one module since
//! this core has no TURN/TCP attributes to keep them apart from.

use stun::attributes::{ATTR_ICE_CONTROLLED, ATTR_ICE_CONTROLLING, ATTR_PRIORITY, ATTR_USE_CANDIDATE};
use stun::checks::check_size;
use stun::message::{Getter, Message, Setter};

const TIE_BREAKER_SIZE: usize = 8;

fn tie_breaker_add_to(value: u64, m: &mut Message, t: stun::attributes::AttrType) -> stun::Result<()> {
    m.add(t, &value.to_be_bytes());
    Ok(())
}

fn tie_breaker_get_from(m: &Message, t: stun::attributes::AttrType) -> stun::Result<u64> {
    let v = m.get(t)?;
    check_size(t, v.len(), TIE_BREAKER_SIZE)?;
    Ok(u64::from_be_bytes([
        v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7],
    ]))
}

/// ICE-CONTROLLED attribute, RFC 5245 §7.1.2.2.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct AttrControlled(pub u64);

impl Setter for AttrControlled {
    fn add_to(&self, m: &mut Message) -> stun::Result<()> {
        tie_breaker_add_to(self.0, m, ATTR_ICE_CONTROLLED)
    }
}

impl Getter for AttrControlled {
    fn get_from(&mut self, m: &Message) -> stun::Result<()> {
        self.0 = tie_breaker_get_from(m, ATTR_ICE_CONTROLLED)?;
        Ok(())
    }
}

/// ICE-CONTROLLING attribute, RFC 5245 §7.1.2.2.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct AttrControlling(pub u64);

impl Setter for AttrControlling {
    fn add_to(&self, m: &mut Message) -> stun::Result<()> {
        tie_breaker_add_to(self.0, m, ATTR_ICE_CONTROLLING)
    }
}

impl Getter for AttrControlling {
    fn get_from(&mut self, m: &Message) -> stun::Result<()> {
        self.0 = tie_breaker_get_from(m, ATTR_ICE_CONTROLLING)?;
        Ok(())
    }
}

/// USE-CANDIDATE attribute, RFC 5245 §7.1.1.1. Flag-only, no value.
#[derive(Debug, Default)]
pub struct UseCandidateAttr;

impl Setter for UseCandidateAttr {
    fn add_to(&self, m: &mut Message) -> stun::Result<()> {
        m.add(ATTR_USE_CANDIDATE, &[]);
        Ok(())
    }
}

impl UseCandidateAttr {
    #[must_use]
    pub fn is_set(m: &Message) -> bool {
        m.get(ATTR_USE_CANDIDATE).is_ok()
    }
}

/// PRIORITY attribute, RFC 5245 §7.1.1.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct PriorityAttr(pub u32);

impl Setter for PriorityAttr {
    fn add_to(&self, m: &mut Message) -> stun::Result<()> {
        m.add(ATTR_PRIORITY, &self.0.to_be_bytes());
        Ok(())
    }
}

impl Getter for PriorityAttr {
    fn get_from(&mut self, m: &Message) -> stun::Result<()> {
        let v = m.get(ATTR_PRIORITY)?;
        check_size(ATTR_PRIORITY, v.len(), 4)?;
        self.0 = u32::from_be_bytes([v[0], v[1], v[2], v[3]]);
        Ok(())
    }
}

#[cfg(test)]
mod stun_attrs_test {
    use super::*;
    use stun::message::BINDING_REQUEST;

    #[test]
    fn test_priority_round_trips_through_message() {
        let mut m = Message::new();
        m.build(&[Box::new(BINDING_REQUEST), Box::new(PriorityAttr(12345))])
            .unwrap();
        let mut decoded = Message::new();
        decoded.write(&m.raw).unwrap();
        let mut p = PriorityAttr::default();
        p.get_from(&decoded).unwrap();
        assert_eq!(p.0, 12345);
    }

    #[test]
    fn test_use_candidate_detected_when_present() {
        let mut m = Message::new();
        m.build(&[Box::new(BINDING_REQUEST), Box::<UseCandidateAttr>::default()])
            .unwrap();
        assert!(UseCandidateAttr::is_set(&m));
    }

    #[test]
    fn test_tie_breaker_round_trips() {
        let mut m = Message::new();
        m.build(&[Box::new(BINDING_REQUEST), Box::new(AttrControlling(0xdead_beef_cafe))])
            .unwrap();
        let mut decoded = Message::new();
        decoded.write(&m.raw).unwrap();
        let mut c = AttrControlling::default();
        c.get_from(&decoded).unwrap();
        assert_eq!(c.0, 0xdead_beef_cafe);
    }
}
