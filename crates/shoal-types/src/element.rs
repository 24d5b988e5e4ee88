use bytes::{Bytes, BytesMut};

use crate::error::TypeError;

/// A fixed-size plain-data element of the shared array.
///
/// Every element type has a known wire width and a little-endian encoding;
/// all serialization sizes in shoal are derived from [`Element::WIRE_SIZE`],
/// never from pointer reinterpretation.
pub trait Element: Copy + Default + PartialEq + Send + Sync + 'static {
    /// Encoded width in bytes.
    const WIRE_SIZE: usize;

    /// Write the little-endian encoding into `buf` (`buf.len() == WIRE_SIZE`).
    fn write_le(&self, buf: &mut [u8]);

    /// Read an element from its little-endian encoding
    /// (`buf.len() == WIRE_SIZE`).
    fn read_le(buf: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty),*) => {
        $(
            impl Element for $ty {
                const WIRE_SIZE: usize = std::mem::size_of::<$ty>();

                fn write_le(&self, buf: &mut [u8]) {
                    buf.copy_from_slice(&self.to_le_bytes());
                }

                fn read_le(buf: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(buf);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(i32, i64, u32, u64, f32, f64);

/// Encode a slice of elements into an owned, little-endian byte buffer.
pub fn encode_slice<E: Element>(elements: &[E]) -> Bytes {
    let mut buf = BytesMut::zeroed(elements.len() * E::WIRE_SIZE);
    for (i, e) in elements.iter().enumerate() {
        e.write_le(&mut buf[i * E::WIRE_SIZE..(i + 1) * E::WIRE_SIZE]);
    }
    buf.freeze()
}

/// Decode a little-endian byte buffer into a vector of elements.
///
/// The byte length must be an exact multiple of the element width.
pub fn decode_slice<E: Element>(bytes: &[u8]) -> Result<Vec<E>, TypeError> {
    if bytes.len() % E::WIRE_SIZE != 0 {
        return Err(TypeError::Misaligned {
            len: bytes.len(),
            elem_size: E::WIRE_SIZE,
        });
    }
    Ok(bytes
        .chunks_exact(E::WIRE_SIZE)
        .map(E::read_le)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_sizes() {
        assert_eq!(<i32 as Element>::WIRE_SIZE, 4);
        assert_eq!(<f32 as Element>::WIRE_SIZE, 4);
        assert_eq!(<f64 as Element>::WIRE_SIZE, 8);
        assert_eq!(<u64 as Element>::WIRE_SIZE, 8);
    }

    #[test]
    fn encode_decode_f32() {
        let values = [1.5f32, -2.25, 0.0, f32::MAX];
        let bytes = encode_slice(&values);
        assert_eq!(bytes.len(), 16);
        let decoded: Vec<f32> = decode_slice(&bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn encode_decode_i64() {
        let values = [i64::MIN, -1, 0, 1, i64::MAX];
        let decoded: Vec<i64> = decode_slice(&encode_slice(&values)).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn encoding_is_little_endian() {
        let bytes = encode_slice(&[0x0102_0304i32]);
        assert_eq!(&bytes[..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn decode_misaligned_fails() {
        let err = decode_slice::<i32>(&[0u8; 6]).unwrap_err();
        assert_eq!(err, TypeError::Misaligned { len: 6, elem_size: 4 });
    }

    #[test]
    fn decode_empty_is_empty() {
        let decoded: Vec<f64> = decode_slice(&[]).unwrap();
        assert!(decoded.is_empty());
    }
}
