//! Agent construction options.
//!
//! Trimmed from the teacher's `agent_config.rs`: no `UDPNetwork`, `Url` list,
//! mDNS, or NAT-1:1 mapping fields (socket binding and mDNS resolution are
//! external collaborators, see `crate::socket`; TURN is placeholder-only).

use std::net::IpAddr;

/// Default Ta pacing interval in milliseconds, RFC 5245 §16.
pub const DEFAULT_TIMER_TA_MS: u32 = 20;

/// Default keepalive interval once a component is READY.
pub const DEFAULT_KEEPALIVE_SECS: u32 = 15;

/// Default STUN port, RFC 5389 §8.
pub const DEFAULT_STUN_PORT: u16 = 3478;

pub struct AgentConfig {
    /// Host to run server-reflexive discovery against. `None` disables
    /// server-reflexive gathering entirely.
    pub stun_server: Option<IpAddr>,
    pub stun_server_port: u16,

    /// Accepted and stored for forward compatibility; never read by
    /// `DiscoveryEngine` (TURN relay allocation is a Non-goal).
    pub turn_server: Option<IpAddr>,
    pub turn_server_port: u16,

    /// Initial role. May flip at runtime via role-conflict resolution.
    pub controlling_mode: bool,

    /// `false` selects a lite agent: never initiates checks, only responds
    /// to inbound Binding requests on its host candidates.
    pub full_mode: bool,

    pub timer_ta_ms: u32,
    pub keepalive_secs: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            stun_server: None,
            stun_server_port: DEFAULT_STUN_PORT,
            turn_server: None,
            turn_server_port: 0,
            controlling_mode: false,
            full_mode: true,
            timer_ta_ms: DEFAULT_TIMER_TA_MS,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
        }
    }
}

impl AgentConfig {
    /// Applies the documented defaults to any field left at its zero value,
    /// mirroring the teacher's `init_with_defaults` fallback pass.
    #[must_use]
    pub fn init_with_defaults(mut self) -> Self {
        if self.timer_ta_ms == 0 {
            self.timer_ta_ms = DEFAULT_TIMER_TA_MS;
        }
        if self.keepalive_secs == 0 {
            self.keepalive_secs = DEFAULT_KEEPALIVE_SECS;
        }
        if self.stun_server.is_some() && self.stun_server_port == 0 {
            self.stun_server_port = DEFAULT_STUN_PORT;
        }
        self
    }
}

#[cfg(test)]
mod config_test {
    use super::*;

    #[test]
    fn test_defaults_applied_to_zeroed_fields() {
        let cfg = AgentConfig {
            timer_ta_ms: 0,
            keepalive_secs: 0,
            ..Default::default()
        }
        .init_with_defaults();
        assert_eq!(cfg.timer_ta_ms, DEFAULT_TIMER_TA_MS);
        assert_eq!(cfg.keepalive_secs, DEFAULT_KEEPALIVE_SECS);
    }

    #[test]
    fn test_stun_port_defaults_only_when_server_set() {
        let cfg = AgentConfig::default().init_with_defaults();
        assert_eq!(cfg.stun_server_port, DEFAULT_STUN_PORT);
    }
}
