//! Front-end command text to DBGp wire commands.
//!
//! ```
//! use dbgp::command::{Translator, break_command};
//!
//! let translator = Translator::new();
//! let (name, args) = break_command("b /home/foo/bar.php 9").unwrap();
//! assert_eq!(name, "breakpoint_set");
//!
//! let wire = translator.prepare(&name, &args).unwrap();
//! assert_eq!(wire.as_str(), "breakpoint_set -i 1 -t line -f /home/foo/bar.php -n 9");
//! ```

mod alias;
mod error;
mod prepare;
mod validate;

pub use error::CommandError;
pub use prepare::WireCommand;

use crate::TransactionIds;

/// Split raw command text into an alias-resolved name and its arguments.
pub fn break_command(raw: &str) -> Result<(String, Vec<String>), CommandError> {
    let mut parts = raw.split_whitespace();
    let name = parts.next().ok_or(CommandError::Empty)?;
    Ok((alias::resolve(name), parts.map(str::to_string).collect()))
}

/// Check arguments without issuing a transaction id.
pub fn validate(name: &str, args: &[String]) -> Result<(), CommandError> {
    validate::validate(name, args).map(|_| ())
}

/// Validates commands and renders them with fresh transaction ids.
///
/// One translator is shared by everything that sends to the engine so ids
/// never repeat within a process.
#[derive(Debug, Default)]
pub struct Translator {
    ids: TransactionIds,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate then render. An id is only consumed by commands that pass
    /// validation.
    pub fn prepare(&self, name: &str, args: &[String]) -> Result<WireCommand, CommandError> {
        let command = validate::validate(name, args)?;
        Ok(command.render(self.ids.next()))
    }
}
