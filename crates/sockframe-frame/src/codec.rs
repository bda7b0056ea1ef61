use crate::error::{FrameError, Result};

/// Length prefix: 2 bytes, big-endian.
pub const PREFIX_SIZE: usize = 2;

/// Largest payload the prefix can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Encode the length prefix for a payload of `len` bytes.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length (2B)  │ Payload          │
/// │ big-endian   │ (Length bytes)   │
/// └──────────────┴──────────────────┘
/// ```
pub fn encode_prefix(len: usize) -> Result<[u8; PREFIX_SIZE]> {
    let len = u16::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: MAX_PAYLOAD,
    })?;
    Ok(len.to_be_bytes())
}

/// Decode a length prefix.
pub fn decode_prefix(prefix: [u8; PREFIX_SIZE]) -> usize {
    u16::from_be_bytes(prefix) as usize
}

/// Total bytes a payload of `len` occupies on the wire.
pub fn wire_size(len: usize) -> usize {
    PREFIX_SIZE + len
}

#[cfg(feature = "async")]
pub use self::tokio_codec::FrameCodec;

#[cfg(feature = "async")]
mod tokio_codec {
    use bytes::{Buf, BufMut, Bytes, BytesMut};
    use tokio_util::codec::{Decoder, Encoder};

    use super::{decode_prefix, encode_prefix, PREFIX_SIZE};
    use crate::error::FrameError;

    /// The same 2-byte framing for `tokio_util::codec::Framed` streams.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FrameCodec;

    impl Decoder for FrameCodec {
        type Item = Bytes;
        type Error = FrameError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FrameError> {
            if src.len() < PREFIX_SIZE {
                return Ok(None);
            }
            let payload_len = decode_prefix([src[0], src[1]]);
            if src.len() < PREFIX_SIZE + payload_len {
                src.reserve(PREFIX_SIZE + payload_len - src.len());
                return Ok(None);
            }
            src.advance(PREFIX_SIZE);
            Ok(Some(src.split_to(payload_len).freeze()))
        }
    }

    impl<'a> Encoder<&'a [u8]> for FrameCodec {
        type Error = FrameError;

        fn encode(&mut self, payload: &'a [u8], dst: &mut BytesMut) -> Result<(), FrameError> {
            let prefix = encode_prefix(payload.len())?;
            dst.reserve(PREFIX_SIZE + payload.len());
            dst.put_slice(&prefix);
            dst.put_slice(payload);
            Ok(())
        }
    }

    impl Encoder<Bytes> for FrameCodec {
        type Error = FrameError;

        fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), FrameError> {
            <Self as Encoder<&[u8]>>::encode(self, payload.as_ref(), dst)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian() {
        assert_eq!(encode_prefix(4).unwrap(), [0, 4]);
        assert_eq!(encode_prefix(0x0102).unwrap(), [1, 2]);
        assert_eq!(decode_prefix([1, 2]), 0x0102);
    }

    #[test]
    fn prefix_bounds() {
        assert_eq!(encode_prefix(MAX_PAYLOAD).unwrap(), [0xFF, 0xFF]);
        let err = encode_prefix(MAX_PAYLOAD + 1).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 65_536, max: 65_535 }
        ));
    }

    #[test]
    fn wire_size_counts_prefix() {
        assert_eq!(wire_size(0), 2);
        assert_eq!(wire_size(4), 6);
    }
}
