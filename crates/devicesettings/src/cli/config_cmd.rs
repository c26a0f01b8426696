//! `config` subcommand — show current configuration and file paths, or write
//! a starter config file.

use std::collections::BTreeMap;
use std::path::Path;

use super::{
    Config, ConfigFilesJson, ConfigOutput, FilePreferenceStore, Result, SettingsError, kv,
    kv_indent, kv_width, load_config, print_json,
};

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path);
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());

    let prefs = config.preferences_file();
    let prefs_exists = prefs.as_ref().is_some_and(|p| p.exists());
    let stored: BTreeMap<String, String> = match &prefs {
        Some(p) if prefs_exists => FilePreferenceStore::open(p).entries().into_iter().collect(),
        _ => BTreeMap::new(),
    };

    if json {
        return print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            files: ConfigFilesJson {
                preferences: prefs.as_ref().map(|p| p.display().to_string()),
                preferences_exists: prefs_exists,
                stored,
            },
            settings: config,
        });
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "sysfs_root:",
            "panel_enable_path:",
            "panel_color_mode_path:",
            "fan_profile_paths:",
            "rotation_command:",
            "Preferences:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    let or_default = |value: &str, default: &str| {
        if value.trim().is_empty() {
            default.to_string()
        } else {
            value.to_string()
        }
    };
    kv_indent("sysfs_root:", or_default(&config.sysfs_root, "/"), w);
    kv_indent("panel_enable_path:", &config.panel_enable_path, w);
    kv_indent("panel_color_mode_path:", &config.panel_color_mode_path, w);
    kv_indent("fan_profile_paths:", config.fan_profile_paths.join(", "), w);
    kv_indent(
        "rotation_command:",
        or_default(&config.rotation_command, "(disabled)"),
        w,
    );
    println!();

    println!("Connectors:");
    for c in &config.connectors {
        let name = if c.name.is_empty() { "-" } else { c.name.as_str() };
        println!("  [{}] {name}", c.connector());
        for (key, value) in [
            ("edid", &c.edid),
            ("status", &c.status),
            ("modes", &c.modes),
            ("mode", &c.mode),
        ] {
            if !value.is_empty() {
                println!("      {key:<8}{value}");
            }
        }
    }
    if let Err(errors) = config.validate() {
        println!();
        println!("Problems:");
        for e in &errors {
            println!("  {e}");
        }
    }
    println!();

    println!("Files:");
    match &prefs {
        Some(p) => {
            let status = if prefs_exists { "present" } else { "not found" };
            kv_indent("Preferences:", format_args!("{} ({status})", p.display()), w);
        }
        None => kv_indent("Preferences:", "(no config directory)", w),
    }
    for (key, value) in &stored {
        println!("    {key} = {value}");
    }
    Ok(())
}

/// Write the effective config (defaults plus any existing overrides) to the
/// config file. An existing file is only replaced with `force`.
pub(super) fn cmd_config_init(custom_path: Option<&Path>, force: bool) -> Result<()> {
    let path = custom_path
        .map(|p| p.to_path_buf())
        .or_else(Config::path)
        .ok_or_else(|| SettingsError::Config("no config directory".into()))?;
    if path.exists() && !force {
        return Err(SettingsError::Config(format!(
            "{} already exists (use --force to replace it)",
            path.display()
        )));
    }
    let config = load_config(custom_path);
    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
