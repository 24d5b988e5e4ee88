use shoal_types::Blob;

use crate::error::{ProtocolError, ProtocolResult};

/// Fixed header width in bytes; identical on every peer.
pub const HEADER_SIZE: usize = 16;

/// Operation carried by a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageKind {
    Get = 1,
    Add = 2,
    ReplyGet = 3,
    ReplyAdd = 4,
}

impl MessageKind {
    /// Wire tag.
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> ProtocolResult<Self> {
        match tag {
            1 => Ok(Self::Get),
            2 => Ok(Self::Add),
            3 => Ok(Self::ReplyGet),
            4 => Ok(Self::ReplyAdd),
            other => Err(ProtocolError::InvalidMessageKind(other)),
        }
    }

    /// The kind a reply to this request carries.
    pub fn reply_kind(self) -> Self {
        match self {
            Self::Get => Self::ReplyGet,
            Self::Add => Self::ReplyAdd,
            reply => reply,
        }
    }

    pub fn is_reply(self) -> bool {
        matches!(self, Self::ReplyGet | Self::ReplyAdd)
    }
}

/// Fixed-size message header: source rank, destination rank, table id, kind.
///
/// Wire layout is four little-endian u32s, [`HEADER_SIZE`] bytes total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub src: u32,
    pub dst: u32,
    pub table_id: u32,
    pub kind: MessageKind,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.src.to_le_bytes());
        buf[4..8].copy_from_slice(&self.dst.to_le_bytes());
        buf[8..12].copy_from_slice(&self.table_id.to_le_bytes());
        buf[12..16].copy_from_slice(&self.kind.tag().to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; HEADER_SIZE]) -> ProtocolResult<Self> {
        let word = |i: usize| {
            u32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into().expect("4-byte chunk"))
        };
        Ok(Self {
            src: word(0),
            dst: word(1),
            table_id: word(2),
            kind: MessageKind::from_tag(word(3))?,
        })
    }
}

/// A header plus an ordered sequence of blobs.
///
/// Messages decoded from the wire own all their payloads
/// (`Message<'static>`); outbound messages may carry blobs borrowed from the
/// caller's buffer, so a large Add never copies its value on the way out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    pub header: Header,
    pub data: Vec<Blob<'a>>,
}

impl<'a> Message<'a> {
    pub fn new(header: Header) -> Self {
        Self { header, data: Vec::new() }
    }

    pub fn with_data(header: Header, data: Vec<Blob<'a>>) -> Self {
        Self { header, data }
    }

    /// Append a payload blob.
    pub fn push(&mut self, blob: Blob<'a>) {
        self.data.push(blob);
    }

    /// Build a reply to `request`: src/dst swapped, kind mapped to its
    /// reply kind, same table id.
    pub fn reply_to(request: &Header, data: Vec<Blob<'a>>) -> Self {
        Self {
            header: Header {
                src: request.dst,
                dst: request.src,
                table_id: request.table_id,
                kind: request.kind.reply_kind(),
            },
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = Header {
            src: 2,
            dst: 0,
            table_id: 7,
            kind: MessageKind::ReplyGet,
        };
        let decoded = Header::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_wire_layout_is_le() {
        let header = Header {
            src: 1,
            dst: 0x0102,
            table_id: 0,
            kind: MessageKind::Get,
        };
        let raw = header.encode();
        assert_eq!(&raw[0..4], &[1, 0, 0, 0]);
        assert_eq!(&raw[4..8], &[0x02, 0x01, 0, 0]);
        assert_eq!(&raw[12..16], &[1, 0, 0, 0]);
    }

    #[test]
    fn unknown_kind_tag_rejected() {
        let mut raw = [0u8; HEADER_SIZE];
        raw[12] = 9;
        assert!(matches!(
            Header::decode(&raw),
            Err(ProtocolError::InvalidMessageKind(9))
        ));
    }

    #[test]
    fn reply_kinds() {
        assert_eq!(MessageKind::Get.reply_kind(), MessageKind::ReplyGet);
        assert_eq!(MessageKind::Add.reply_kind(), MessageKind::ReplyAdd);
        assert!(MessageKind::ReplyAdd.is_reply());
        assert!(!MessageKind::Get.is_reply());
    }

    #[test]
    fn reply_to_swaps_endpoints() {
        let request = Header {
            src: 3,
            dst: 1,
            table_id: 4,
            kind: MessageKind::Add,
        };
        let reply = Message::reply_to(&request, vec![]);
        assert_eq!(reply.header.src, 1);
        assert_eq!(reply.header.dst, 3);
        assert_eq!(reply.header.table_id, 4);
        assert_eq!(reply.header.kind, MessageKind::ReplyAdd);
        assert!(reply.data.is_empty());
    }
}
