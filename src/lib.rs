#![warn(rust_2018_idioms)]

pub mod address;
pub mod agent;
pub mod candidate;
pub mod component;
mod error;
pub mod pair;
pub mod rand;
pub mod socket;
pub mod stats;
pub mod stream;
mod stun_attrs;

pub use agent::{Agent, AgentConfig, AgentEvent};
pub use error::{Error, Result};
