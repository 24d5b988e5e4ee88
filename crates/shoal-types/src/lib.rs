//! Foundation types for shoal, a distributed shared-array primitive.
//!
//! This crate provides the building blocks every other shoal crate depends
//! on:
//!
//! - [`Blob`] — a length-tagged contiguous byte region with an explicit
//!   ownership mode (owned or borrowed) and bounds-checked typed views
//! - [`Element`] — fixed-size plain-data element types with a defined
//!   little-endian wire encoding
//! - [`ClusterContext`] — the ordered peer list and this node's rank

pub mod blob;
pub mod cluster;
pub mod element;
pub mod error;

pub use blob::Blob;
pub use cluster::ClusterContext;
pub use element::{decode_slice, encode_slice, Element};
pub use error::TypeError;
