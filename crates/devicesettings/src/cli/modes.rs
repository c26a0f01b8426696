//! `modes` subcommand — list the modes of one connector.

use super::{ConnectorIndex, ModesOutput, Result, Stack, print_json};

pub(super) fn cmd_modes(stack: &Stack, connector: ConnectorIndex, json: bool) -> Result<()> {
    let (modes, preferred) = stack.run(|s| {
        let preferred = s
            .preferred_mode_index(connector)
            .inspect_err(|e| log::debug!("no preferred mode: {e}"))
            .ok();
        (s.modes(connector), preferred)
    });
    let modes = modes?;

    if json {
        return print_json(&ModesOutput {
            connector,
            preferred,
            modes,
        });
    }

    if modes.is_empty() {
        println!("No modes reported on {connector}.");
        return Ok(());
    }

    println!("Modes on {connector}:");
    for m in &modes {
        let marker = if preferred == Some(m.index) { "*" } else { " " };
        println!("{marker} [{}] {:<20} {}", m.index, m.description, m.color);
    }
    if preferred.is_none() {
        println!();
        println!("No display attached; set-mode will fail on {connector}.");
    }
    Ok(())
}
