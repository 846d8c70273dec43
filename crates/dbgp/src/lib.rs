//! The DBGp protocol, IDE side.
//!
//! - [`message`] turns engine XML payloads into [`Message`] values
//! - [`command`] turns short front-end commands such as `b index.php 12` into
//!   exact wire commands carrying a transaction id
pub mod command;
pub mod message;
mod transaction;

pub use command::{CommandError, Translator, WireCommand};
pub use message::{
    Breakpoint, BreakpointId, BreakpointType, Context, DecodeError, EngineError, Message,
    MessageType, Properties, StackFrame, State, Variable,
};
pub use transaction::{TransactionId, TransactionIds};
