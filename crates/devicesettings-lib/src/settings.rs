//! Device settings service — wires the identity logic to its collaborators.
//!
//! [`DeviceSettings`] owns no state of its own. Every call queries the display
//! service and the preference store afresh, so a monitor swapped between two
//! calls is picked up by the second one.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::Config;
use crate::control::{self, ControlFiles};
use crate::display::{ConnectorIndex, DisplayService};
use crate::error::{Result, SettingsError};
use crate::identity::{self, UidMap};
use crate::modes::{self, DisplayMode};
use crate::prefs::PreferenceStore;
use crate::rotation::RotationRefresher;

/// Paths of the single-value control nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlNodes {
    pub panel_enable: PathBuf,
    pub panel_color_mode: PathBuf,
    pub fan_profiles: Vec<PathBuf>,
}

impl ControlNodes {
    pub fn from_config(config: &Config) -> Self {
        ControlNodes {
            panel_enable: PathBuf::from(&config.panel_enable_path),
            panel_color_mode: PathBuf::from(&config.panel_color_mode_path),
            fan_profiles: config.fan_paths(),
        }
    }
}

/// One attached display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayInfo {
    pub connector: ConnectorIndex,
    pub label: String,
    pub uid: String,
    pub manufacturer_id: String,
    pub monitor_name: String,
    /// Mode index applied by `set_display_mode`.
    pub mode_index: u32,
}

/// One entry of a connector's mode list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeEntry {
    pub index: u32,
    /// e.g. `"1920x1080 60Hz"`.
    pub description: String,
    /// e.g. `"RGB 8-bit Rec. 709"`.
    pub color: String,
    #[serde(flatten)]
    pub mode: DisplayMode,
}

pub struct DeviceSettings<'a> {
    display: &'a dyn DisplayService,
    rotation: &'a dyn RotationRefresher,
    prefs: &'a dyn PreferenceStore,
    control: &'a dyn ControlFiles,
    nodes: ControlNodes,
}

impl<'a> DeviceSettings<'a> {
    pub fn new(
        display: &'a dyn DisplayService,
        rotation: &'a dyn RotationRefresher,
        prefs: &'a dyn PreferenceStore,
        control: &'a dyn ControlFiles,
        nodes: ControlNodes,
    ) -> Self {
        DeviceSettings {
            display,
            rotation,
            prefs,
            control,
            nodes,
        }
    }

    // ── Display modes ──

    /// Mode index `set_display_mode` would apply on `connector`.
    pub fn preferred_mode_index(&self, connector: ConnectorIndex) -> Result<u32> {
        let index = identity::resolve_mode_index(
            connector,
            |c| self.display.edid_get_info(c),
            |key| self.prefs.get(key),
        )?;
        Ok(index)
    }

    /// Apply the stored mode for the display on `connector` and refresh
    /// rotation. Returns the applied index.
    ///
    /// On failure nothing is changed and rotation is not refreshed.
    pub fn set_display_mode(&self, connector: ConnectorIndex) -> Result<u32> {
        let result = self.preferred_mode_index(connector).and_then(|index| {
            identity::apply_mode(
                connector,
                index,
                |c, i| self.display.mode_set_index(c, i),
                |send, relayout| self.rotation.update_rotation(send, relayout),
            )?;
            Ok(index)
        });
        match &result {
            Ok(index) => log::info!("{connector}: mode {index} applied"),
            Err(e) => log::error!("Failed to set mode on {connector}: {e}"),
        }
        result
    }

    /// Remember `index` as the mode of the display on `connector`, then apply it.
    ///
    /// The choice is stored per display, not per connector. The panel has no
    /// stored choice and only accepts index 0. An index beyond the
    /// connector's mode list is rejected without storing anything.
    pub fn select_display_mode(&self, connector: ConnectorIndex, index: u32) -> Result<()> {
        if connector.is_panel() {
            if index != 0 {
                return Err(SettingsError::ControlValue(format!(
                    "{connector} always uses mode 0"
                )));
            }
        } else {
            let edid = self.display.edid_get_info(connector)?;
            let count = self.display.modes(connector)?.len();
            if index as usize >= count {
                return Err(SettingsError::ControlValue(format!(
                    "mode index {index} out of range ({count} modes on {connector})"
                )));
            }
            let uid = identity::display_uid(&edid, connector);
            self.prefs
                .set(&identity::mode_pref_key(&uid), &index.to_string())?;
        }
        self.set_display_mode(connector)?;
        Ok(())
    }

    /// Uid → connector for every attached display.
    pub fn uid_map(&self) -> UidMap {
        identity::build_uid_map(|c| self.display.edid_get_info(c))
    }

    /// Every attached display in connector order.
    pub fn displays(&self) -> Vec<DisplayInfo> {
        let mut displays = Vec::new();
        for connector in ConnectorIndex::known() {
            let edid = match self.display.edid_get_info(connector) {
                Ok(edid) => edid,
                Err(e) => {
                    log::debug!("{e}");
                    continue;
                }
            };
            let mode_index =
                identity::resolve_mode_index(connector, |_| Ok(edid.clone()), |key| {
                    self.prefs.get(key)
                })
                .unwrap_or(0);
            displays.push(DisplayInfo {
                connector,
                label: identity::display_label(&edid, connector),
                uid: identity::display_uid(&edid, connector),
                manufacturer_id: edid.manufacturer_id,
                monitor_name: edid.monitor_name,
                mode_index,
            });
        }
        displays
    }

    /// Modes supported on `connector`, with their descriptions.
    pub fn modes(&self, connector: ConnectorIndex) -> Result<Vec<ModeEntry>> {
        let modes = self.display.modes(connector)?;
        Ok(modes
            .into_iter()
            .enumerate()
            .map(|(i, mode)| ModeEntry {
                index: i as u32,
                description: modes::mode_info_string(&mode),
                color: modes::color_info_string(&mode),
                mode,
            })
            .collect())
    }

    // ── Control nodes ──

    pub fn set_internal_display_state(&self, on: bool) -> Result<()> {
        log::debug!("set_internal_display_state: {on}");
        control::set_internal_display_state(self.control, &self.nodes.panel_enable, on)
    }

    pub fn set_panel_color_mode(&self, mode: &str) -> Result<()> {
        log::debug!("set_panel_color_mode: {mode}");
        control::set_panel_color_mode(self.control, &self.nodes.panel_color_mode, mode)
    }

    pub fn panel_color_mode(&self) -> Result<String> {
        control::panel_color_mode(self.control, &self.nodes.panel_color_mode)
    }

    pub fn set_fan_profile(&self, profile: &str) -> Result<()> {
        log::debug!("set_fan_profile: {profile}");
        control::set_fan_profile(self.control, &self.nodes.fan_profiles, profile)
    }
}
