/// Expand a short alias to its DBGp command name.
///
/// Anything that is not an alias is taken as a command name in its own
/// right and lower-cased.
pub(crate) fn resolve(name: &str) -> String {
    let full = match name {
        "b" => "breakpoint_set",
        "bg" => "breakpoint_get",
        "br" => "breakpoint_remove",
        "bl" => "breakpoint_list",
        "vl" => "context_get",
        "ev" => "eval",
        "var" => "property_get",
        "r" => "run",
        "stk" => "stack_get",
        "sr" | "src" => "source",
        "s" => "status",
        "si" => "step_into",
        "so" => "step_out",
        "sv" | "sov" => "step_over",
        "st" => "stop",
        other => return other.to_lowercase(),
    };
    full.to_string()
}
