//! `panel` / `color-mode` subcommands — internal panel power and OLED color mode.

use super::{ColorModeOutput, PanelState, Result, Stack, print_json};

pub(super) fn cmd_panel(stack: &Stack, state: PanelState) -> Result<()> {
    let on = state == PanelState::On;
    stack.run(|s| s.set_internal_display_state(on))?;
    println!("Panel: {}", if on { "ON" } else { "OFF" });
    Ok(())
}

pub(super) fn cmd_color_mode(stack: &Stack, mode: Option<&str>, json: bool) -> Result<()> {
    let color_mode = stack.run(|s| {
        if let Some(mode) = mode {
            s.set_panel_color_mode(mode)?;
        }
        s.panel_color_mode()
    })?;

    if json {
        return print_json(&ColorModeOutput { color_mode });
    }
    println!("Color mode: {color_mode}");
    Ok(())
}
