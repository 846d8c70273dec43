//! Line-oriented front-end on stdin/stdout.

use std::fmt::Write as _;

use dbgp::{Message, State, Variable};
use session::{SessionHandle, Verbosity};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::help::help;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Quit,
    Print(String),
    Nothing,
}

pub(crate) struct Console {
    session: SessionHandle,
    verbosity: Verbosity,
}

impl Console {
    pub(crate) fn new(session: SessionHandle, verbosity: Verbosity) -> Self {
        Self { session, verbosity }
    }

    /// Read lines until `bye` or until the input ends, then cancel
    /// `shutdown`.
    pub(crate) async fn run(self, mut lines: mpsc::Receiver<String>, shutdown: CancellationToken) {
        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => return,
                line = lines.recv() => line,
            };
            let Some(line) = line else {
                tracing::debug!("end of input");
                break;
            };

            match self.handle_line(&line).await {
                Outcome::Quit => break,
                Outcome::Print(text) => println!("{text}"),
                Outcome::Nothing => {}
            }
        }
        shutdown.cancel();
    }

    pub(crate) async fn handle_line(&self, line: &str) -> Outcome {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] | ["refresh"] => Outcome::Nothing,
            ["bye" | "quit" | "q"] => Outcome::Quit,
            ["help", args @ ..] => Outcome::Print(help(args)),
            ["verbose"] => {
                self.verbosity.set(true);
                Outcome::Nothing
            }
            ["no-verbose"] => {
                self.verbosity.set(false);
                Outcome::Nothing
            }
            ["state"] => match self.session.current_state().await {
                Ok(messages) if messages.is_empty() => Outcome::Print("nothing yet".to_string()),
                Ok(messages) => Outcome::Print(
                    messages
                        .iter()
                        .map(summarise)
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
                Err(e) => Outcome::Print(e.to_string()),
            },
            _ => match self.session.submit(line).await {
                Ok(()) => Outcome::Nothing,
                Err(e) => Outcome::Print(e.to_string()),
            },
        }
    }
}

/// Print every message the session broadcasts.
pub(crate) async fn print_messages(mut messages: mpsc::Receiver<Message>, json: bool) {
    while let Some(message) = messages.recv().await {
        if json {
            match message.to_json() {
                Ok(text) => println!("{text}"),
                Err(e) => tracing::warn!(error = %e, "cannot serialise message"),
            }
        } else {
            println!("{}", summarise(&message));
        }
    }
}

/// Human readable rendering of a message.
pub(crate) fn summarise(message: &Message) -> String {
    let mut text = String::new();

    let _ = write!(text, "[{}]", state_label(message.state));
    if !message.command().is_empty() {
        let _ = write!(text, " {}", message.command());
    }
    let properties = &message.properties;
    if !properties.filename.is_empty() {
        let _ = write!(text, " {}", properties.filename);
        if let Some(line) = properties.line_number {
            let _ = write!(text, ":{line}");
        }
    }
    if let Some(error) = &properties.error {
        let _ = write!(text, "\nerror {}: {}", error.code, error.message);
    }

    for breakpoint in message.breakpoints.values() {
        let _ = write!(
            text,
            "\n  {:>4}  {}:{}{}",
            breakpoint.id,
            breakpoint.filename,
            breakpoint.line_number,
            if breakpoint.enabled { "" } else { " (disabled)" }
        );
    }
    for frame in &message.stack_frames {
        let _ = write!(
            text,
            "\n  #{} {} {}:{}",
            frame.level, frame.function, frame.filename, frame.line_number
        );
    }
    for variable in &message.context.local {
        write_variable(&mut text, variable, 1);
    }
    if !message.context.global.is_empty() {
        text.push_str("\n  globals:");
        for variable in &message.context.global {
            write_variable(&mut text, variable, 2);
        }
    }
    if message.content_is_base64 {
        let _ = write!(text, "\n<binary, base64> {}", message.content);
    } else if !message.content.is_empty() {
        text.push('\n');
        text.push_str(&message.content);
    }
    text
}

fn write_variable(text: &mut String, variable: &Variable, depth: usize) {
    let indent = "  ".repeat(depth);
    let name = if variable.full_name.is_empty() {
        &variable.name
    } else {
        &variable.full_name
    };
    let _ = write!(text, "\n{indent}{name} ({})", variable.var_type);
    if variable.is_base64 {
        let _ = write!(text, " = <binary, base64> {}", variable.value);
    } else if !variable.value.is_empty() {
        let _ = write!(text, " = {}", variable.value);
    } else if variable.has_children && !variable.children_loaded {
        let _ = write!(text, " [{} children]", variable.num_children);
    }
    for child in &variable.children {
        write_variable(text, child, depth + 1);
    }
}

fn state_label(state: State) -> &'static str {
    match state {
        State::None => "-",
        State::Starting => "starting",
        State::Stopping => "stopping",
        State::Stopped => "stopped",
        State::Running => "running",
        State::Break => "break",
        State::Awake => "awake",
        State::Asleep => "asleep",
        State::Waiting => "waiting",
    }
}
