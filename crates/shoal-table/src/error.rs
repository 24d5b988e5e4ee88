use shoal_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("invalid shard plan: {total} elements over {shards} shards (need total > shards > 0)")]
    InvalidPlan { total: usize, shards: usize },

    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("bad table key {0} (only the whole-table sentinel is supported)")]
    BadKey(i32),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("bad reply: {0}")]
    BadReply(String),

    #[error("shard {shard} out of range (shard count {count})")]
    ShardOutOfRange { shard: usize, count: usize },

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
