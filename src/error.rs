use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors the agent can return directly to a caller.
///
/// Protocol-level faults (malformed STUN, bad integrity, role conflicts, single
/// pair failures) are never surfaced this way — they are absorbed and folded
/// into state transitions or counters, per the propagation policy in the core
/// design notes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Indicates local username fragment insufficient bits are provided.
    /// Has to be at least 24 bits long.
    #[error("local username fragment is less than 24 bits long")]
    ErrLocalUfragInsufficientBits,

    /// Indicates local password insufficient bits are provided.
    /// Has to be at least 128 bits long.
    #[error("local password is less than 128 bits long")]
    ErrLocalPwdInsufficientBits,

    /// Indicates the remote ufrag is shorter than RFC 8445 allows.
    #[error("remote ufrag must be between 4 and 256 characters")]
    ErrRemoteUfragLength,

    /// Indicates the remote pwd is shorter than RFC 8445 allows.
    #[error("remote pwd must be between 22 and 256 characters")]
    ErrRemotePwdLength,

    #[error("unknown stream id {0}")]
    ErrUnknownStream(u64),

    #[error("unknown component id {0} in stream {1}")]
    ErrUnknownComponent(u16, u64),

    #[error("no local address has been added to the agent")]
    ErrNoLocalAddress,

    #[error("failed to bind a socket for stream {0} component {1}")]
    ErrSocketBind(u64, u16, #[source] io::Error),

    #[error("component {0}/{1} has no usable socket")]
    ErrNoSocket(u64, u16),

    #[error("send failed")]
    ErrSend(#[source] io::Error),

    #[error("lite agents cannot gather non-host candidates")]
    ErrLiteNonHostCandidate,

    #[error("{0}")]
    Stun(#[from] stun::Error),
}
