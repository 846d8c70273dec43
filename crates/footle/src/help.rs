struct Topic {
    names: &'static [&'static str],
    text: &'static str,
}

const TOPICS: &[Topic] = &[
    // console
    Topic {
        names: &["bye", "quit", "q"],
        text: "Quit footle.",
    },
    Topic {
        names: &["refresh"],
        text: "Do nothing; an empty line does the same.",
    },
    Topic {
        names: &["verbose"],
        text: "Log all traffic between footle and the debugger engine.",
    },
    Topic {
        names: &["no-verbose"],
        text: "Stop logging engine traffic.",
    },
    Topic {
        names: &["state"],
        text: "Show the current execution state and all breakpoints.",
    },
    // session
    Topic {
        names: &["on"],
        text: "Start listening for debugger engines.",
    },
    Topic {
        names: &["off"],
        text: "Stop listening and let go of any attached engine.",
    },
    Topic {
        names: &["continue"],
        text: "Detach from the engine so the script runs to the end, ignoring breakpoints.",
    },
    Topic {
        names: &["update_source"],
        text: "Tell front-ends to reload a file.\nUsage: update_source FILE",
    },
    // engine
    Topic {
        names: &["breakpoint_set", "b"],
        text: "Usage: breakpoint_set FILE LINE\nWithout an attached engine the breakpoint is queued and set when one attaches.",
    },
    Topic {
        names: &["breakpoint_get", "bg"],
        text: "Usage: breakpoint_get BREAKPOINT-ID",
    },
    Topic {
        names: &["breakpoint_remove", "br"],
        text: "Usage: breakpoint_remove BREAKPOINT-ID\nQueued breakpoints have negative ids.",
    },
    Topic {
        names: &["breakpoint_list", "bl"],
        text: "List the breakpoints known to the engine.",
    },
    Topic {
        names: &["context_get", "vl"],
        text: "Show variables.\nUsage: context_get [local|global [STACK-DEPTH]]\nExample: context_get global 2",
    },
    Topic {
        names: &["dbgp"],
        text: "Send a raw DBGp command; the transaction id is added for you.\nUsage: dbgp COMMAND [ARGS...]\nExample: dbgp feature_get -n max_depth",
    },
    Topic {
        names: &["eval", "ev"],
        text: "Evaluate an expression in the current scope.\nUsage: eval EXPRESSION",
    },
    Topic {
        names: &["property_get", "var"],
        text: "Show one variable. The local context is used unless global is given.\nUsage: property_get [local|global] NAME\nExample: property_get $user['name']",
    },
    Topic {
        names: &["run", "r"],
        text: "Carry on with execution.",
    },
    Topic {
        names: &["stack_get", "stk"],
        text: "Show the call stack.",
    },
    Topic {
        names: &["source", "sr", "src"],
        text: "Show source code.\nUsage: source FILE | source START-LINE LINE-COUNT\nThe second form reads from the file being executed.",
    },
    Topic {
        names: &["status", "s"],
        text: "Show the engine status.",
    },
    Topic {
        names: &["step_into", "si"],
        text: "Step into a function or method.",
    },
    Topic {
        names: &["step_out", "so"],
        text: "Step out of the current function or method.",
    },
    Topic {
        names: &["step_over", "sv", "sov"],
        text: "Step to the next line.",
    },
    Topic {
        names: &["stop", "st"],
        text: "End execution.",
    },
];

/// `help` with no argument lists every command; with one, explains it.
pub(crate) fn help(args: &[&str]) -> String {
    match args.first() {
        None => overview(),
        Some(name) => match TOPICS.iter().find(|topic| topic.names.iter().any(|n| n == name)) {
            Some(topic) => format!("{}: {}", topic.names.join(", "), topic.text),
            None => format!("unknown command {name:?}; try help"),
        },
    }
}

fn overview() -> String {
    let mut text = String::from("help [COMMAND]\nExample: help b\n\nCommands and their aliases:\n");
    for topic in TOPICS {
        text.push_str(&topic.names.join(", "));
        text.push('\n');
    }
    text
}
