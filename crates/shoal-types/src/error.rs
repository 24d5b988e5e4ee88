use thiserror::Error;

/// Errors produced by blob, element, and membership operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("byte length {len} is not a multiple of element size {elem_size}")]
    Misaligned { len: usize, elem_size: usize },

    #[error("element index {index} out of bounds (count {count})")]
    OutOfBounds { index: usize, count: usize },

    #[error("slice range {start}..{end} out of bounds (len {len})")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("cluster membership list is empty")]
    EmptyCluster,

    #[error("rank {rank} out of range for cluster of size {size}")]
    RankOutOfRange { rank: usize, size: usize },
}
