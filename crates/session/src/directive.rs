//! Commands that steer footle itself and never reach the engine.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    #[error("invalid command: {given}; the right format is: {usage}")]
    Usage { given: String, usage: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive {
    /// Start listening for engines.
    On,
    /// Stop listening and drop any engine.
    Off,
    /// Let the engine run to completion by detaching from it.
    Continue,
    /// Ask front-ends to reload a file.
    UpdateSource(String),
}

impl Directive {
    /// `Ok(None)` when `name` is not a directive.
    pub(crate) fn parse(name: &str, args: &[String]) -> Result<Option<Self>, DirectiveError> {
        let (directive, usage) = match (name, args) {
            ("on", []) => return Ok(Some(Directive::On)),
            ("off", []) => return Ok(Some(Directive::Off)),
            ("continue", []) => return Ok(Some(Directive::Continue)),
            ("update_source", [file]) => return Ok(Some(Directive::UpdateSource(file.clone()))),
            ("on", _) => ("on", "on"),
            ("off", _) => ("off", "off"),
            ("continue", _) => ("continue", "continue"),
            ("update_source", _) => ("update_source", "update_source FILENAME"),
            _ => return Ok(None),
        };

        let mut given = directive.to_string();
        for arg in args {
            given.push(' ');
            given.push_str(arg);
        }
        Err(DirectiveError::Usage { given, usage })
    }
}
