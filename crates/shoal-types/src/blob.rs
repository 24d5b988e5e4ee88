use std::ops::Range;

use bytes::{Bytes, BytesMut};

use crate::element::{encode_slice, Element};
use crate::error::TypeError;

/// A length-tagged contiguous byte region with an explicit ownership mode.
///
/// A blob either owns its bytes (cheaply cloneable, reference-counted) or
/// borrows caller memory for a bounded lifetime. Message payloads received
/// from the wire are always owned (`Blob<'static>`); outbound payloads may
/// borrow directly from the caller's buffer so partitioning a large value
/// never copies it. The lifetime parameter makes "a viewing blob must not
/// outlive the memory it references" a compile-time rule.
#[derive(Clone, Debug)]
pub struct Blob<'a>(Repr<'a>);

#[derive(Clone, Debug)]
enum Repr<'a> {
    Owned(Bytes),
    Borrowed(&'a [u8]),
}

impl<'a> Blob<'a> {
    /// An owned blob over an existing byte buffer.
    pub fn from_bytes(bytes: Bytes) -> Blob<'static> {
        Blob(Repr::Owned(bytes))
    }

    /// An owned blob holding a copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> Blob<'static> {
        Blob(Repr::Owned(Bytes::copy_from_slice(data)))
    }

    /// A borrowed view of caller memory; valid only while `data` lives.
    pub fn borrowed(data: &'a [u8]) -> Blob<'a> {
        Blob(Repr::Borrowed(data))
    }

    /// An owned, zero-filled blob of `len` bytes.
    pub fn zeroed(len: usize) -> Blob<'static> {
        Blob(Repr::Owned(BytesMut::zeroed(len).freeze()))
    }

    /// An owned blob holding the little-endian encoding of one element.
    pub fn from_element<E: Element>(value: E) -> Blob<'static> {
        Self::from_elements(&[value])
    }

    /// An owned blob holding the little-endian encoding of a slice.
    pub fn from_elements<E: Element>(values: &[E]) -> Blob<'static> {
        Blob(Repr::Owned(encode_slice(values)))
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns `true` if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// The underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        match &self.0 {
            Repr::Owned(bytes) => bytes,
            Repr::Borrowed(slice) => slice,
        }
    }

    /// A bounds-checked sub-blob over `range`.
    ///
    /// Zero-copy in both modes: owned blobs share the underlying buffer,
    /// borrowed blobs re-borrow the sub-slice.
    pub fn slice(&self, range: Range<usize>) -> Result<Blob<'a>, TypeError> {
        let len = self.len();
        if range.start > range.end || range.end > len {
            return Err(TypeError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        Ok(match &self.0 {
            Repr::Owned(bytes) => Blob(Repr::Owned(bytes.slice(range))),
            Repr::Borrowed(slice) => {
                let full: &'a [u8] = *slice;
                Blob(Repr::Borrowed(&full[range]))
            }
        })
    }

    /// Convert into an owned blob, copying only if currently borrowed.
    pub fn into_owned(self) -> Blob<'static> {
        match self.0 {
            Repr::Owned(bytes) => Blob(Repr::Owned(bytes)),
            Repr::Borrowed(slice) => Blob::copy_from_slice(slice),
        }
    }

    /// Number of `E` elements held, if the byte length divides exactly.
    pub fn element_count<E: Element>(&self) -> Result<usize, TypeError> {
        let len = self.len();
        if len % E::WIRE_SIZE != 0 {
            return Err(TypeError::Misaligned {
                len,
                elem_size: E::WIRE_SIZE,
            });
        }
        Ok(len / E::WIRE_SIZE)
    }

    /// Decode the element at `index`, bounds-checked.
    pub fn element<E: Element>(&self, index: usize) -> Result<E, TypeError> {
        let count = self.element_count::<E>()?;
        if index >= count {
            return Err(TypeError::OutOfBounds { index, count });
        }
        let start = index * E::WIRE_SIZE;
        Ok(E::read_le(&self.as_slice()[start..start + E::WIRE_SIZE]))
    }

    /// Decode the full blob into a vector of elements.
    pub fn to_elements<E: Element>(&self) -> Result<Vec<E>, TypeError> {
        crate::element::decode_slice(self.as_slice())
    }
}

impl PartialEq for Blob<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Blob<'_> {}
