//! CLI subcommands — display modes, panel power and color, fan profile.

mod config_cmd;
mod displays;
mod fan;
mod mode;
mod modes;
mod panel;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use serde::Serialize;

pub(super) use devicesettings_lib::config::Config;
pub(super) use devicesettings_lib::control::SysfsControl;
pub(super) use devicesettings_lib::display::{ConnectorIndex, SysfsDisplayService};
pub(super) use devicesettings_lib::error::{Result, SettingsError};
pub(super) use devicesettings_lib::prefs::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStore,
};
pub(super) use devicesettings_lib::rotation::{CommandRefresher, NoopRefresher, RotationRefresher};
pub(super) use devicesettings_lib::settings::{
    ControlNodes, DeviceSettings, DisplayInfo, ModeEntry,
};

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {}", format_kv(key, value, w - 2));
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SettingsError::Config(format!("JSON output: {e}")))?;
    println!("{text}");
    Ok(())
}

// ── Service stack ──

/// Config plus the long-lived collaborators of [`DeviceSettings`].
pub(super) struct Stack {
    pub config: Config,
    control: SysfsControl,
    prefs: Box<dyn PreferenceStore>,
    rotation: Box<dyn RotationRefresher>,
}

impl Stack {
    /// Load and validate the config, then open the preference store.
    pub fn open(custom_path: Option<&Path>) -> Result<Self> {
        let config = load_config(custom_path);
        if let Err(errors) = config.validate() {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(SettingsError::Config(msgs.join("; ")));
        }
        let control = match config.sysfs_root() {
            Some(root) => SysfsControl::with_root(root),
            None => SysfsControl::new(),
        };
        Ok(Stack {
            control,
            prefs: open_preferences(config.preferences_file()),
            rotation: rotation_refresher(&config.rotation_command),
            config,
        })
    }

    /// Build a [`DeviceSettings`] over this stack and hand it to `f`.
    pub fn run<T>(&self, f: impl FnOnce(&DeviceSettings<'_>) -> T) -> T {
        let display = SysfsDisplayService::new(&self.control, &self.config.connectors);
        let settings = DeviceSettings::new(
            &display,
            self.rotation.as_ref(),
            self.prefs.as_ref(),
            &self.control,
            ControlNodes::from_config(&self.config),
        );
        f(&settings)
    }

    /// Name configured for `connector`, if any.
    pub fn connector_name(&self, connector: ConnectorIndex) -> Option<&str> {
        self.config
            .connector(connector)
            .map(|c| c.name.as_str())
            .filter(|n| !n.is_empty())
    }
}

/// Preference store at `path`. Without a path, choices only last for this run.
fn open_preferences(path: Option<PathBuf>) -> Box<dyn PreferenceStore> {
    match path {
        Some(path) => Box::new(FilePreferenceStore::open(path)),
        None => {
            log::warn!("no config directory, mode choices will not be saved");
            Box::new(MemoryPreferenceStore::new())
        }
    }
}

fn rotation_refresher(command: &str) -> Box<dyn RotationRefresher> {
    if command.trim().is_empty() {
        Box::new(NoopRefresher)
    } else {
        Box::new(CommandRefresher::new(command))
    }
}

/// Load config from `custom_path` or the platform default, logging warnings.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(path) => Config::load_from(path),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    config
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct DisplaysOutput {
    pub count: usize,
    pub displays: Vec<DisplayInfo>,
}

#[derive(Serialize)]
pub(super) struct ModesOutput {
    pub connector: ConnectorIndex,
    /// Index `set-mode` would apply; `None` if the connector has no display.
    pub preferred: Option<u32>,
    pub modes: Vec<ModeEntry>,
}

#[derive(Serialize)]
pub(super) struct ModeAppliedOutput {
    pub connector: ConnectorIndex,
    pub index: u32,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ColorModeOutput {
    pub color_mode: String,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub files: ConfigFilesJson,
}

#[derive(Serialize)]
pub(super) struct ConfigFilesJson {
    pub preferences: Option<String>,
    pub preferences_exists: bool,
    /// Readable entries of the preference file, e.g. `mode_<uid>` → index.
    pub stored: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PanelState {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum Command {
    /// List attached displays with their labels and uids
    Displays,

    /// List the modes supported on a connector
    Modes {
        /// Connector: panel, hdmi1, hdmi2 or an index
        connector: ConnectorIndex,
    },

    /// Apply the stored mode of the display on a connector
    SetMode {
        /// Connector: panel, hdmi1, hdmi2 or an index
        connector: ConnectorIndex,
    },

    /// Remember a mode for the display on a connector and apply it
    SelectMode {
        /// Connector: panel, hdmi1, hdmi2 or an index
        connector: ConnectorIndex,
        /// Mode index as listed by `modes`
        index: u32,
    },

    /// Turn the internal panel on or off
    Panel {
        #[arg(value_enum)]
        state: PanelState,
    },

    /// Show the OLED color mode, or set it
    ColorMode {
        /// New color mode (ASCII). Omit to show the current one.
        mode: Option<String>,
    },

    /// Set the fan profile
    FanProfile {
        /// Profile name, e.g. quiet or cool
        profile: String,
    },

    /// Show current configuration and file paths
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
        /// With --init, replace an existing config file
        #[arg(long, requires = "init")]
        force: bool,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        Command::Displays => displays::cmd_displays(&Stack::open(config_path)?, json),
        Command::Modes { connector } => {
            modes::cmd_modes(&Stack::open(config_path)?, connector, json)
        }
        Command::SetMode { connector } => {
            mode::cmd_set_mode(&Stack::open(config_path)?, connector, json)
        }
        Command::SelectMode { connector, index } => {
            mode::cmd_select_mode(&Stack::open(config_path)?, connector, index, json)
        }
        Command::Panel { state } => {
            if json {
                warn_json_unsupported("panel");
            }
            panel::cmd_panel(&Stack::open(config_path)?, state)
        }
        Command::ColorMode { mode } => {
            panel::cmd_color_mode(&Stack::open(config_path)?, mode.as_deref(), json)
        }
        Command::FanProfile { profile } => {
            if json {
                warn_json_unsupported("fan-profile");
            }
            fan::cmd_fan_profile(&Stack::open(config_path)?, &profile)
        }
        Command::Config { init: true, force } => {
            if json {
                warn_json_unsupported("config --init");
            }
            config_cmd::cmd_config_init(config_path, force)
        }
        Command::Config { init: false, .. } => config_cmd::cmd_config(json, config_path),
    }
}



#[cfg(test)]
mod stack_tests {
    use super::*;

    #[test]
    fn preferences_without_config_dir_stay_in_memory() {
        let prefs = open_preferences(None);
        prefs.set("mode_1", "2").unwrap();
        assert_eq!(prefs.get("mode_1").as_deref(), Some("2"));
    }

    #[test]
    fn rotation_command_runs_only_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("refreshed");
        rotation_refresher("  ").update_rotation(true, true);
        assert!(!marker.exists());

        rotation_refresher(&format!("touch '{}'", marker.display())).update_rotation(true, true);
        assert!(marker.exists());
    }

    #[test]
    fn preferences_with_path_use_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        open_preferences(Some(path.clone())).set("mode_1", "2").unwrap();
        assert_eq!(
            FilePreferenceStore::open(&path).get("mode_1").as_deref(),
            Some("2")
        );
    }
}
