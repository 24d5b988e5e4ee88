//! Wire protocol for shoal.
//!
//! A message is a fixed-size [`Header`] followed by an ordered sequence of
//! blobs, framed on the wire as length-prefixed parts terminated by a
//! cleared more-flag. The layout is fixed and unversioned; every peer must
//! agree on [`HEADER_SIZE`] exactly.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{read_message, write_message, MAX_FRAME_SIZE};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{Header, Message, MessageKind, HEADER_SIZE};
