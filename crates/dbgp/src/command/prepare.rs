//! Rendering of validated commands into wire text.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::validate::Command;
use crate::TransactionId;

/// A NUL-terminated DBGp command ready for the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCommand {
    text: String,
    transaction_id: TransactionId,
}

impl WireCommand {
    /// Command text without the terminator.
    pub fn as_str(&self) -> &str {
        self.text.trim_end_matches('\0')
    }

    /// The DBGp command name, e.g. `breakpoint_set`.
    pub fn name(&self) -> &str {
        self.as_str().split(' ').next().unwrap_or_default()
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }
}

impl fmt::Display for WireCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<[u8]> for WireCommand {
    fn as_ref(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl Command {
    pub(crate) fn render(&self, tx: TransactionId) -> WireCommand {
        let text = match self {
            Command::Bare(name) => format!("{name} -i {tx}"),
            Command::BreakpointSet { file, line } => {
                format!("breakpoint_set -i {tx} -t line -f {file} -n {line}")
            }
            Command::BreakpointGet(id) => format!("breakpoint_get -i {tx} -d {id}"),
            Command::BreakpointRemove(id) => format!("breakpoint_remove -i {tx} -d {id}"),
            Command::Eval(expression) => {
                format!("eval -i {tx} -- {}", STANDARD.encode(expression))
            }
            Command::PropertyGet { context, name } => {
                let mut text = format!("property_get -i {tx}");
                if let Some(context) = context {
                    text.push_str(&format!(" -c {}", context.id()));
                }
                text.push_str(&format!(" -n \"{}\"", escape(name)));
                text
            }
            Command::ContextGet { context, depth } => {
                let mut text = format!("context_get -i {tx}");
                if let Some(context) = context {
                    text.push_str(&format!(" -c {}", context.id()));
                }
                if let Some(depth) = depth {
                    text.push_str(&format!(" -d {depth}"));
                }
                text
            }
            Command::SourceFile(file) => format!("source -i {tx} -f {file}"),
            Command::SourceLines { begin, count } => {
                let end = begin.saturating_add(count.saturating_sub(1));
                format!("source -i {tx} -b {begin} -e {end}")
            }
            Command::Raw { name, args } => {
                let mut text = format!("{name} -i {tx}");
                for arg in args {
                    text.push(' ');
                    text.push_str(arg);
                }
                text
            }
        };

        WireCommand {
            text: text + "\0",
            transaction_id: tx,
        }
    }
}

/// Backslash-escape quotes, NUL and backslash for a double-quoted DBGp
/// argument.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\'' | '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\0' => escaped.push_str("\\0"),
            _ => escaped.push(c),
        }
    }
    escaped
}
