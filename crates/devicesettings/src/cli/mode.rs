//! `set-mode` / `select-mode` subcommands — apply a display's mode.

use super::{ConnectorIndex, ModeAppliedOutput, Result, Stack, print_json};

pub(super) fn cmd_set_mode(stack: &Stack, connector: ConnectorIndex, json: bool) -> Result<()> {
    let index = stack.run(|s| s.set_display_mode(connector))?;
    report(stack, connector, index, json)
}

pub(super) fn cmd_select_mode(
    stack: &Stack,
    connector: ConnectorIndex,
    index: u32,
    json: bool,
) -> Result<()> {
    stack.run(|s| s.select_display_mode(connector, index))?;
    report(stack, connector, index, json)
}

fn report(stack: &Stack, connector: ConnectorIndex, index: u32, json: bool) -> Result<()> {
    // Only used for the message, so a failing re-read is not an error.
    let description = stack
        .run(|s| s.modes(connector))
        .ok()
        .and_then(|modes| modes.into_iter().nth(index as usize))
        .map(|m| m.description);

    if json {
        return print_json(&ModeAppliedOutput {
            connector,
            index,
            description,
        });
    }

    match description {
        Some(d) => println!("{connector}: mode {index} applied ({d})"),
        None => println!("{connector}: mode {index} applied"),
    }
    Ok(())
}
