//! Testing utilities for the transport layer.
//!
//! This module provides helpers for testing code that talks DBGp, including
//! an in-memory transport and engine-side framing.

mod memory;

pub use memory::MemoryTransport;

/// Frame a payload the way an engine does: `<len>\0<payload>\0`.
///
/// # Example
///
/// ```
/// use transport::testing::frame_payload;
///
/// let bytes = frame_payload("<init></init>");
/// assert_eq!(bytes, b"13\0<init></init>\0");
/// ```
pub fn frame_payload(payload: impl AsRef<[u8]>) -> Vec<u8> {
    let payload = payload.as_ref();
    let mut frame = payload.len().to_string().into_bytes();
    frame.push(0);
    frame.extend_from_slice(payload);
    frame.push(0);
    frame
}

/// Frame several payloads back to back.
pub fn frame_payloads<T: AsRef<[u8]>>(payloads: &[T]) -> Vec<u8> {
    payloads.iter().flat_map(frame_payload).collect()
}
