//! `{name}` placeholder rendering for step commands

use crate::session::parse_command;
use crate::workflow::outcome::AbortReason;
use std::collections::HashMap;

/// Split `command` into argv, then substitute `{name}` in every argument with
/// the value extracted by the step called `name`.
///
/// Splitting happens first, so an extracted path containing spaces stays a
/// single argument. `{{` and `}}` produce literal braces.
pub fn render(command: &str, values: &HashMap<String, String>) -> Result<Vec<String>, AbortReason> {
    let argv = parse_command(command).map_err(|e| AbortReason::SpawnFailed(e.to_string()))?;
    argv.iter().map(|arg| render_arg(arg, values)).collect()
}

fn render_arg(arg: &str, values: &HashMap<String, String>) -> Result<String, AbortReason> {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        match tail[1..].find('}') {
            Some(close) => {
                let name = &tail[1..1 + close];
                let value = values
                    .get(name)
                    .ok_or_else(|| AbortReason::UnresolvedPlaceholder(name.to_string()))?;
                out.push_str(value);
                rest = &tail[close + 2..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}
