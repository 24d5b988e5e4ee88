use std::net::SocketAddr;

use shoal_protocol::ProtocolError;
use shoal_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    /// Startup configuration problem: bad peer file, unresolvable rank.
    /// Recoverable by fixing the configuration, unlike the wire errors
    /// below.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to connect to peer {peer} after {attempts} attempts: {source}")]
    Connect {
        peer: SocketAddr,
        attempts: u32,
        source: std::io::Error,
    },

    /// No outbound channel for the destination rank: out of range, or a
    /// self-destination send. An invariant violation; callers treat it as
    /// fatal.
    #[error("no route to rank {dst} (cluster size {size})")]
    NoRoute { dst: usize, size: usize },

    #[error("inbound channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Membership(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
