//! Application configuration — TOML-based, platform-aware paths.
//!
//! Holds every sysfs node path, the connector table used by the sysfs display
//! service and the rotation refresh command.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::display::ConnectorIndex;

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str = "\
    # devicesettings configuration, written by `devicesettings config --init`.\n\
    # Every field is optional; removed fields fall back to their defaults.\n\n";

/// Sysfs nodes of one display connector.
///
/// Empty `edid` / `status` paths mean the connector has no such node; the
/// built-in panel typically has neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector index (0 = built-in panel).
    pub index: u32,

    /// Free-form name shown by the CLI, e.g. "HDMI-A-1".
    #[serde(default)]
    pub name: String,

    /// DRM EDID node.
    #[serde(default)]
    pub edid: String,

    /// DRM status node (`connected` / `disconnected`).
    #[serde(default)]
    pub status: String,

    /// fbdev node listing supported modes, one per line.
    #[serde(default)]
    pub modes: String,

    /// fbdev node selecting the active mode.
    #[serde(default)]
    pub mode: String,
}

impl ConnectorConfig {
    pub fn connector(&self) -> ConnectorIndex {
        ConnectorIndex(self.index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the absolute node paths are resolved below. Empty = `/`.
    #[serde(default)]
    pub sysfs_root: String,

    /// Internal panel power node.
    #[serde(default = "default_panel_enable_path")]
    pub panel_enable_path: String,

    /// OLED color mode node.
    #[serde(default = "default_panel_color_mode_path")]
    pub panel_color_mode_path: String,

    /// Fan profile nodes, written in order.
    #[serde(default = "default_fan_profile_paths")]
    pub fan_profile_paths: Vec<String>,

    /// Command run after a mode change to refresh rotation/layout. Empty = disabled.
    #[serde(default)]
    pub rotation_command: String,

    /// Preference store file. Empty = `preferences.json` in the config directory.
    #[serde(default)]
    pub preferences_path: String,

    /// Display connectors, one `[[connectors]]` table each.
    #[serde(default = "default_connectors")]
    pub connectors: Vec<ConnectorConfig>,
}

fn default_panel_enable_path() -> String {
    "/sys/bus/platform/devices/tegradc.0/enable".into()
}
fn default_panel_color_mode_path() -> String {
    "/sys/devices/50000000.host1x/tegradc.0/panel_color_mode".into()
}
fn default_fan_profile_paths() -> Vec<String> {
    vec![
        "/sys/devices/pwm-fan/fan_profile".into(),
        "/sys/devices/thermal-fan-est/fan_profile".into(),
    ]
}

fn default_connectors() -> Vec<ConnectorConfig> {
    let hdmi = |index: u32, port: u32, fb: u32| ConnectorConfig {
        index,
        name: format!("HDMI-A-{port}"),
        edid: format!("/sys/class/drm/card0-HDMI-A-{port}/edid"),
        status: format!("/sys/class/drm/card0-HDMI-A-{port}/status"),
        modes: format!("/sys/class/graphics/fb{fb}/modes"),
        mode: format!("/sys/class/graphics/fb{fb}/mode"),
    };
    vec![
        ConnectorConfig {
            index: ConnectorIndex::PANEL.0,
            name: "DSI-1".into(),
            edid: String::new(),
            status: String::new(),
            modes: "/sys/class/graphics/fb0/modes".into(),
            mode: "/sys/class/graphics/fb0/mode".into(),
        },
        hdmi(ConnectorIndex::HDMI1.0, 1, 1),
        hdmi(ConnectorIndex::HDMI2.0, 2, 2),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sysfs_root: String::new(),
            panel_enable_path: default_panel_enable_path(),
            panel_color_mode_path: default_panel_color_mode_path(),
            fan_profile_paths: default_fan_profile_paths(),
            rotation_command: String::new(),
            preferences_path: String::new(),
            connectors: default_connectors(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required node path is empty.
    EmptyPath(&'static str),
    /// A node path is not absolute.
    RelativePath { field: String, path: String },
    /// `fan_profile_paths` is empty.
    NoFanProfilePaths,
    /// Two `[[connectors]]` entries share an index.
    DuplicateConnector(u32),
    /// A connector is missing its fbdev nodes.
    IncompleteConnector { index: u32, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyPath(field) => write!(f, "{field} cannot be empty"),
            ValidationError::RelativePath { field, path } => {
                write!(f, "Invalid {field}: \"{path}\" is not an absolute path")
            }
            ValidationError::NoFanProfilePaths => {
                write!(f, "fan_profile_paths must list at least one node")
            }
            ValidationError::DuplicateConnector(index) => {
                write!(f, "Connector {index} is configured more than once")
            }
            ValidationError::IncompleteConnector { index, reason } => {
                write!(f, "Invalid connector {index}: {reason}")
            }
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("devicesettings"))
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be read or parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Self::default(), vec![]),
            Err(e) => {
                let warning = format!(
                    "config read error ({}), using defaults: {e}",
                    path.display()
                );
                (Self::default(), vec![warning])
            }
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Node table for `connector`, if configured.
    pub fn connector(&self, connector: ConnectorIndex) -> Option<&ConnectorConfig> {
        self.connectors.iter().find(|c| c.index == connector.0)
    }

    /// Root for [`crate::control::SysfsControl`], `None` for `/`.
    pub fn sysfs_root(&self) -> Option<PathBuf> {
        let root = self.sysfs_root.trim();
        (!root.is_empty()).then(|| PathBuf::from(root))
    }

    pub fn fan_paths(&self) -> Vec<PathBuf> {
        self.fan_profile_paths.iter().map(PathBuf::from).collect()
    }

    /// Preference store location: `preferences_path`, else the default file.
    pub fn preferences_file(&self) -> Option<PathBuf> {
        let custom = self.preferences_path.trim();
        if custom.is_empty() {
            crate::prefs::FilePreferenceStore::default_path()
        } else {
            Some(PathBuf::from(custom))
        }
    }

    /// Validate the entire config, collecting all errors.
    ///
    /// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_node_path(&mut errors, "panel_enable_path", &self.panel_enable_path);
        check_node_path(
            &mut errors,
            "panel_color_mode_path",
            &self.panel_color_mode_path,
        );

        if self.fan_profile_paths.is_empty() {
            errors.push(ValidationError::NoFanProfilePaths);
        }
        for (i, path) in self.fan_profile_paths.iter().enumerate() {
            check_absolute(&mut errors, format!("fan_profile_paths[{i}]"), path);
        }

        let mut seen = HashSet::new();
        for c in &self.connectors {
            if !seen.insert(c.index) {
                errors.push(ValidationError::DuplicateConnector(c.index));
            }
            for (field, path) in [("modes", &c.modes), ("mode", &c.mode)] {
                if path.trim().is_empty() {
                    errors.push(ValidationError::IncompleteConnector {
                        index: c.index,
                        reason: format!("{field} node is not set"),
                    });
                }
            }
            for (field, path) in [
                ("edid", &c.edid),
                ("status", &c.status),
                ("modes", &c.modes),
                ("mode", &c.mode),
            ] {
                if !path.trim().is_empty() {
                    check_absolute(&mut errors, format!("connectors[{}].{field}", c.index), path);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_node_path(errors: &mut Vec<ValidationError>, field: &'static str, path: &str) {
    if path.trim().is_empty() {
        errors.push(ValidationError::EmptyPath(field));
    } else {
        check_absolute(errors, field.to_string(), path);
    }
}

fn check_absolute(errors: &mut Vec<ValidationError>, field: String, path: &str) {
    if !Path::new(path.trim()).is_absolute() {
        errors.push(ValidationError::RelativePath {
            field,
            path: path.to_string(),
        });
    }
}
