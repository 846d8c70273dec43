//! Error types for the transport layer.

use std::io;

/// Errors that can occur while framing DBGp traffic.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bytes before the first NUL are not a decimal length.
    #[error("malformed length prefix {0:?}")]
    MalformedLength(String),

    /// The declared payload exceeds the configured maximum size.
    #[error("message size {size} exceeds maximum allowed {max}")]
    MessageTooLarge {
        /// The declared size.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// The byte after the payload was not the NUL terminator.
    #[error("missing NUL terminator after {0} byte payload")]
    MissingTerminator(usize),

    /// The stream ended in the middle of a frame.
    #[error("stream closed with {available} of {expected} bytes of the frame received")]
    Truncated {
        /// Bytes the frame needs, or zero when the length prefix itself was cut.
        expected: usize,
        /// Bytes that did arrive.
        available: usize,
    },

    /// An outgoing command did not end in NUL.
    #[error("outgoing command is not NUL terminated")]
    Unterminated,
}
