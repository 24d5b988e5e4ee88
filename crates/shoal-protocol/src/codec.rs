//! Multipart frame codec.
//!
//! Wire layout of one message:
//!
//! ```text
//! [flag: 1 byte][header: 16 bytes]          header frame
//! [flag: 1 byte][len: 8 bytes LE u64]       length frame   } per blob,
//! [flag: 1 byte][payload: len bytes]        payload frame  } in order
//! ```
//!
//! `flag` is 1 ("more frames follow") on every frame except the very last
//! frame of the message, which carries 0. A message with no blobs is a lone
//! header frame. The returned byte counts are the logical sizes the peers
//! agree on (header + length fields + payloads); flag bytes are excluded.

use std::io::{Read, Write};

use bytes::Bytes;
use shoal_types::Blob;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Header, Message, HEADER_SIZE};

/// Upper bound on a single frame's payload; a length frame above this is
/// treated as protocol desync rather than an allocation request.
pub const MAX_FRAME_SIZE: u64 = 1 << 30;

const MORE: u8 = 1;
const LAST: u8 = 0;

/// Serialize one message. Returns the logical byte count
/// `HEADER_SIZE + Σ(8 + blob.len())`.
pub fn write_message<W: Write>(w: &mut W, msg: &Message<'_>) -> ProtocolResult<usize> {
    let header_flag = if msg.data.is_empty() { LAST } else { MORE };
    write_frame(w, header_flag, &msg.header.encode())?;
    let mut written = HEADER_SIZE;

    for (i, blob) in msg.data.iter().enumerate() {
        let len = blob.len() as u64;
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_FRAME_SIZE });
        }
        write_frame(w, MORE, &len.to_le_bytes())?;
        let payload_flag = if i + 1 == msg.data.len() { LAST } else { MORE };
        write_frame(w, payload_flag, blob.as_slice())?;
        written += 8 + blob.len();
    }

    w.flush()?;
    tracing::trace!(bytes = written, blobs = msg.data.len(), "wrote message");
    Ok(written)
}

/// Deserialize exactly one message. Returns the message (all blobs owned)
/// and the logical byte count read.
pub fn read_message<R: Read>(r: &mut R) -> ProtocolResult<(Message<'static>, usize)> {
    let header_flag = read_flag(r)?;
    let mut raw = [0u8; HEADER_SIZE];
    fill(r, &mut raw)?;
    let header = Header::decode(&raw)?;

    let mut msg = Message::new(header);
    let mut received = HEADER_SIZE;
    let mut more = header_flag == MORE;

    while more {
        let len_flag = read_flag(r)?;
        if len_flag != MORE {
            return Err(ProtocolError::Framing(
                "length frame not followed by a payload frame".into(),
            ));
        }
        let mut len_raw = [0u8; 8];
        fill(r, &mut len_raw)?;
        let len = u64::from_le_bytes(len_raw);
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: len, max: MAX_FRAME_SIZE });
        }

        let payload_flag = read_flag(r)?;
        let mut payload = vec![0u8; len as usize];
        fill(r, &mut payload)?;
        msg.push(Blob::from_bytes(Bytes::from(payload)));
        received += 8 + len as usize;
        more = payload_flag == MORE;
    }

    tracing::trace!(bytes = received, blobs = msg.data.len(), "read message");
    Ok((msg, received))
}

fn write_frame<W: Write>(w: &mut W, flag: u8, content: &[u8]) -> ProtocolResult<()> {
    w.write_all(&[flag])?;
    w.write_all(content)?;
    Ok(())
}

fn read_flag<R: Read>(r: &mut R) -> ProtocolResult<u8> {
    let mut flag = [0u8; 1];
    fill(r, &mut flag)?;
    match flag[0] {
        MORE | LAST => Ok(flag[0]),
        other => Err(ProtocolError::InvalidFlag(other)),
    }
}

/// Read exactly `buf.len()` bytes; a short read is a truncated frame.
fn fill<R: Read>(r: &mut R, buf: &mut [u8]) -> ProtocolResult<()> {
    let mut read = 0;
    while read < buf.len() {
        let n = r.read(&mut buf[read..])?;
        if n == 0 {
            return Err(ProtocolError::TruncatedFrame {
                expected: buf.len(),
                actual: read,
            });
        }
        read += n;
    }
    Ok(())
}
