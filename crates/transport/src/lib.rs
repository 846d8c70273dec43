//! Async DBGp transport layer using tokio.
//!
//! DBGp framing is asymmetric. The engine sends
//!
//! ```text
//! <decimal length> NUL <xml payload> NUL
//! ```
//!
//! while the IDE side sends bare NUL-terminated command lines such as
//! `run -i 7\0` with no length prefix.
//!
//! # Architecture
//!
//! - [`DbgpCodec`] implements `Decoder` (engine frames to raw payload bytes)
//!   and `Encoder` (pre-rendered commands to bytes)
//! - [`DbgpReader`] wraps an `AsyncRead` to produce a `Stream` of payloads
//! - [`DbgpWriter`] wraps an `AsyncWrite` to provide a `Sink` for commands
//!
//! # Scope
//!
//! This crate only deals with bytes on the wire. Turning payloads into
//! messages and rendering commands with transaction ids lives in `dbgp`;
//! deciding what to send and when lives in `session`.

mod codec;
mod error;
mod reader;
mod transport;
mod writer;

pub mod testing;

pub use codec::DbgpCodec;
pub use error::CodecError;
pub use reader::DbgpReader;
pub use transport::{DbgpTransport, split};
pub use writer::DbgpWriter;
