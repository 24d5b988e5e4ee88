//! Blocking point-to-point transport for shoal.
//!
//! One inbound listener per process, one outbound channel per peer,
//! synchronous request/reply semantics over the shoal frame codec. Also
//! hosts peer-file parsing, local-rank detection, and the sequential
//! dispatcher that fans worker requests out shard by shard.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod membership;
pub mod transport;

pub use config::NetConfig;
pub use dispatch::SyncDispatcher;
pub use error::NetError;
pub use membership::{cluster_from_file, cluster_with_local, parse_peer_file, resolve_rank};
pub use transport::Transport;
