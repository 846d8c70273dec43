//! Structured form of everything the engine sends, and of the synthetic
//! messages the session hands to front-ends.

mod decoder;
mod value;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use decoder::{DecodeError, decode, decode_bytes};

/// Engine breakpoint ids are positive; locally queued ones are negative.
pub type BreakpointId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Init,
    #[default]
    Response,
}

/// Engine status, plus the states the session synthesises for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// The response carried no status.
    #[default]
    #[serde(rename = "")]
    None,
    Starting,
    Stopping,
    Stopped,
    Running,
    Break,
    /// Listening for engines.
    Awake,
    /// Not listening.
    Asleep,
    /// Outside a debugging session.
    Waiting,
}

impl State {
    /// Map a DBGp `status` attribute. Unknown values are treated as absent.
    pub fn from_status(status: &str) -> Self {
        match status {
            "starting" => State::Starting,
            "stopping" => State::Stopping,
            "stopped" => State::Stopped,
            "running" => State::Running,
            "break" => State::Break,
            "" => State::None,
            other => {
                tracing::debug!(status = other, "unrecognised engine status");
                State::None
            }
        }
    }

    /// States that describe where the session is, as opposed to
    /// acknowledgements that leave it unchanged.
    pub fn is_session_state(self) -> bool {
        matches!(
            self,
            State::Starting | State::Break | State::Stopped | State::Awake | State::Asleep
        )
    }
}

/// An `<error>` element inside a response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Properties {
    pub command: String,
    pub filename: String,
    pub line_number: Option<u32>,
    pub transaction_id: Option<u32>,
    pub error: Option<EngineError>,
    pub breakpoint_id: Option<BreakpointId>,
}

/// Variables grouped by the DBGp context they were fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Context {
    pub local: Vec<Variable>,
    pub global: Vec<Variable>,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.global.is_empty()
    }
}

/// A node of a `<property>` tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub full_name: String,
    pub var_type: String,
    pub value: String,
    /// Access modifiers such as `public static`.
    pub facet: String,
    pub has_children: bool,
    pub num_children: u32,
    pub children_loaded: bool,
    /// `value` is still base64 because it decodes to binary data.
    pub is_base64: bool,
    pub children: Vec<Variable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakpointType {
    #[default]
    Line,
    Code,
    Conditional,
    Call,
    Return,
    Exception,
    Watch,
}

impl BreakpointType {
    pub fn from_attr(kind: &str) -> Option<Self> {
        Some(match kind {
            "line" => BreakpointType::Line,
            "code" => BreakpointType::Code,
            "conditional" => BreakpointType::Conditional,
            "call" => BreakpointType::Call,
            "return" => BreakpointType::Return,
            "exception" => BreakpointType::Exception,
            "watch" => BreakpointType::Watch,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub kind: BreakpointType,
    pub enabled: bool,
    pub filename: String,
    pub line_number: u32,
}

impl Breakpoint {
    pub fn line(id: BreakpointId, filename: impl Into<String>, line_number: u32) -> Self {
        Self {
            id,
            kind: BreakpointType::Line,
            enabled: true,
            filename: filename.into(),
            line_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackFrame {
    pub level: u32,
    #[serde(rename = "where")]
    pub function: String,
    pub kind: String,
    pub filename: String,
    pub line_number: u32,
}

/// The unit handed to front-ends.
///
/// Built by [`decode`] from engine XML, or synthesised by the session to
/// announce state changes that never touched the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub message_type: MessageType,
    pub state: State,
    pub properties: Properties,
    pub context: Context,
    pub content: String,
    /// `content` is binary the engine sent as base64 and is still encoded.
    #[serde(default)]
    pub content_is_base64: bool,
    pub breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    pub stack_frames: Vec<StackFrame>,
}

impl Message {
    /// A response-shaped message that did not come from the engine.
    pub fn synthetic(state: State, command: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Response,
            state,
            properties: Properties {
                command: command.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn command(&self) -> &str {
        &self.properties.command
    }

    /// JSON form used by front-ends that speak JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
