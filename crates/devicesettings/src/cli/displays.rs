//! `displays` subcommand — list attached displays and their identities.

use super::{DisplaysOutput, Result, Stack, kv_indent, kv_width, print_json};

pub(super) fn cmd_displays(stack: &Stack, json: bool) -> Result<()> {
    let displays = stack.run(|s| s.displays());

    if json {
        return print_json(&DisplaysOutput {
            count: displays.len(),
            displays,
        });
    }

    if displays.is_empty() {
        println!("No displays attached.");
        return Ok(());
    }

    let w = kv_width(&[], &["Manufacturer:", "Monitor:", "Uid:", "Mode:"]);
    for (i, d) in displays.iter().enumerate() {
        if i > 0 {
            println!();
        }
        match stack.connector_name(d.connector) {
            Some(name) => println!("[{}] {} ({name})", d.connector, d.label),
            None => println!("[{}] {}", d.connector, d.label),
        }
        if !d.manufacturer_id.is_empty() {
            kv_indent("Manufacturer:", &d.manufacturer_id, w);
        }
        if !d.monitor_name.is_empty() {
            kv_indent("Monitor:", &d.monitor_name, w);
        }
        kv_indent("Uid:", &d.uid, w);
        kv_indent("Mode:", d.mode_index, w);
    }
    Ok(())
}
