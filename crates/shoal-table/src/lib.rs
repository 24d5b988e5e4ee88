//! Worker and server shard tables for the shoal distributed shared array.
//!
//! A global array of `N` fixed-size elements is split into `S` contiguous
//! shards, one per server rank. The worker side ([`ArrayWorker`]) partitions
//! whole-array Get/Add requests into per-shard sub-requests and merges shard
//! replies back into the caller's buffer; the server side ([`ArrayServer`])
//! owns one shard's storage, applies updates through a pluggable
//! [`Updater`], and checkpoints raw shard bytes.
//!
//! Shard extents come from a single [`ShardPlan`] shared by both sides, so
//! worker boundaries and server local sizes agree for every `(N, S, rank)`
//! by construction.

pub mod dispatch;
pub mod error;
pub mod plan;
pub mod server;
pub mod updater;
pub mod worker;

pub use dispatch::{Dispatch, TableOp};
pub use error::TableError;
pub use plan::ShardPlan;
pub use server::ArrayServer;
pub use updater::{AddUpdater, Updater};
pub use worker::ArrayWorker;

/// Reserved sentinel key meaning "every shard". The array table supports
/// whole-table operations only; any other key is rejected.
pub const WHOLE_TABLE_KEY: i32 = -1;
