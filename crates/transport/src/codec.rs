//! Byte-level DBGp framing as a tokio-util codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// Default maximum payload size (16 MB).
const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Longest length prefix worth waiting for; `usize::MAX` has 20 digits.
const MAX_PREFIX_LEN: usize = 20;

/// Codec for DBGp frames.
///
/// Incoming frames look like:
/// ```text
/// 187\0<?xml version="1.0"?><response ... />\0
/// ```
/// and decode to the raw payload bytes between the two NULs. Character set
/// handling is left to the message decoder.
///
/// Outgoing items are written verbatim and must already carry their trailing
/// NUL.
#[derive(Debug, Clone)]
pub struct DbgpCodec {
    /// Maximum allowed payload size in bytes.
    max_message_size: usize,
}

impl DbgpCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Create a new codec with a custom maximum payload size.
    ///
    /// Frames declaring more than this are rejected with [`CodecError::MessageTooLarge`].
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for DbgpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DbgpCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(prefix_end) = find_prefix_end(src) else {
            if src.len() > MAX_PREFIX_LEN {
                return Err(CodecError::MalformedLength(
                    String::from_utf8_lossy(&src[..MAX_PREFIX_LEN]).into_owned(),
                ));
            }
            // Need more data
            return Ok(None);
        };

        let payload_len = parse_length(&src[..prefix_end])?;
        if payload_len > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: payload_len,
                max: self.max_message_size,
            });
        }

        // prefix + NUL + payload + NUL
        let total_length = prefix_end + 1 + payload_len + 1;
        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        if src[total_length - 1] != 0 {
            return Err(CodecError::MissingTerminator(payload_len));
        }

        src.advance(prefix_end + 1);
        let payload = src.split_to(payload_len).freeze();
        src.advance(1);

        Ok(Some(payload))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let expected = find_prefix_end(src)
            .and_then(|end| parse_length(&src[..end]).ok().map(|len| end + len + 2))
            .unwrap_or(0);
        Err(CodecError::Truncated {
            expected,
            available: src.len(),
        })
    }
}

impl<T> Encoder<T> for DbgpCodec
where
    T: AsRef<[u8]>,
{
    type Error = CodecError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = item.as_ref();
        if bytes.last() != Some(&0) {
            return Err(CodecError::Unterminated);
        }
        dst.reserve(bytes.len());
        dst.put_slice(bytes);
        Ok(())
    }
}

/// Find the NUL that ends the length prefix.
fn find_prefix_end(buf: &[u8]) -> Option<usize> {
    buf.iter().take(MAX_PREFIX_LEN + 1).position(|b| *b == 0)
}

fn parse_length(prefix: &[u8]) -> Result<usize, CodecError> {
    let text = std::str::from_utf8(prefix)
        .map_err(|_| CodecError::MalformedLength(String::from_utf8_lossy(prefix).into_owned()))?;
    text.trim()
        .parse()
        .map_err(|_| CodecError::MalformedLength(text.to_string()))
}
