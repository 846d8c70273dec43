//! Argument checks, producing a typed command ready for rendering.

use std::str::FromStr;

use super::CommandError;
use crate::BreakpointId;

/// Commands whose only wire argument is the transaction id.
const BARE_COMMANDS: &[&str] = &[
    "breakpoint_list",
    "run",
    "stack_get",
    "status",
    "step_into",
    "step_out",
    "step_over",
    "stop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContextKind {
    Local,
    Global,
}

impl ContextKind {
    fn parse(arg: &str) -> Option<Self> {
        match arg {
            "local" => Some(ContextKind::Local),
            "global" => Some(ContextKind::Global),
            _ => None,
        }
    }

    pub(crate) fn id(self) -> u8 {
        match self {
            ContextKind::Local => 0,
            ContextKind::Global => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Bare(&'static str),
    BreakpointSet {
        file: String,
        line: u32,
    },
    BreakpointGet(BreakpointId),
    BreakpointRemove(BreakpointId),
    Eval(String),
    PropertyGet {
        context: Option<ContextKind>,
        name: String,
    },
    ContextGet {
        context: Option<ContextKind>,
        depth: Option<u32>,
    },
    SourceFile(String),
    SourceLines {
        begin: u32,
        count: u32,
    },
    Raw {
        name: String,
        args: Vec<String>,
    },
}

/// Check `args` against the rules for `name` (already alias-resolved).
pub(crate) fn validate(name: &str, args: &[String]) -> Result<Command, CommandError> {
    if let Some(&bare) = BARE_COMMANDS.iter().find(|bare| **bare == name) {
        return if args.is_empty() {
            Ok(Command::Bare(bare))
        } else {
            Err(CommandError::NoArguments(bare))
        };
    }

    match name {
        "breakpoint_set" => match args {
            [file, line] => Ok(Command::BreakpointSet {
                file: file.clone(),
                line: positive(line, "a positive line number as the second argument")?,
            }),
            _ => Err(CommandError::Usage("breakpoint_set FILE LINE")),
        },
        "breakpoint_get" => match args {
            [id] => Ok(Command::BreakpointGet(number(id, "a breakpoint id")?)),
            _ => Err(CommandError::Usage("breakpoint_get ID")),
        },
        "breakpoint_remove" => match args {
            [id] => Ok(Command::BreakpointRemove(number(id, "a breakpoint id")?)),
            _ => Err(CommandError::Usage("breakpoint_remove ID")),
        },
        "eval" if args.is_empty() => Err(CommandError::Usage("eval EXPRESSION")),
        "eval" => Ok(Command::Eval(args.join(" "))),
        "property_get" => {
            let (context, rest) = match args.split_first() {
                Some((first, rest)) => match ContextKind::parse(first) {
                    Some(context) => (Some(context), rest),
                    None => (None, args),
                },
                None => (None, args),
            };
            if rest.is_empty() {
                return Err(CommandError::Usage("property_get [local|global] NAME"));
            }
            // Names such as foo['bar baz'] arrive split on whitespace.
            Ok(Command::PropertyGet {
                context,
                name: rest.join(" "),
            })
        }
        "context_get" => {
            const USAGE: &str = "context_get [local|global [DEPTH]]";
            let (context, depth) = match args {
                [] => (None, None),
                [context] => (Some(context), None),
                [context, depth] => (Some(context), Some(depth)),
                _ => return Err(CommandError::Usage(USAGE)),
            };
            let context = match context {
                Some(arg) => Some(ContextKind::parse(arg).ok_or(CommandError::Usage(USAGE))?),
                None => None,
            };
            let depth = depth
                .map(|depth| number(depth, "a stack depth"))
                .transpose()?;
            Ok(Command::ContextGet { context, depth })
        }
        "source" => match args {
            [file] => Ok(Command::SourceFile(file.clone())),
            [begin, count] => Ok(Command::SourceLines {
                begin: positive(begin, "a positive starting line")?,
                count: positive(count, "a positive line count")?,
            }),
            _ => Err(CommandError::Usage("source FILE | source START COUNT")),
        },
        "dbgp" => match args.split_first() {
            Some((name, rest)) => Ok(Command::Raw {
                name: name.clone(),
                args: rest.to_vec(),
            }),
            None => Err(CommandError::Usage("dbgp COMMAND [ARGS...]")),
        },
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn number<T: FromStr>(arg: &str, what: &'static str) -> Result<T, CommandError> {
    arg.parse().map_err(|_| CommandError::InvalidNumber {
        what,
        value: arg.to_string(),
    })
}

fn positive(arg: &str, what: &'static str) -> Result<u32, CommandError> {
    match number::<u32>(arg, what)? {
        0 => Err(CommandError::InvalidNumber {
            what,
            value: arg.to_string(),
        }),
        n => Ok(n),
    }
}
