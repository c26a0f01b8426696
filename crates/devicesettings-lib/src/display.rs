//! Display service — trait + sysfs/fbdev backend + mock.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ConnectorConfig;
use crate::control::ControlFiles;
use crate::edid::{self, EdidInfo};
use crate::modes::{self, DisplayMode};

// ── Connector index ──

/// A physical display output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectorIndex(pub u32);

impl ConnectorIndex {
    /// The built-in panel. Always uses mode index 0.
    pub const PANEL: ConnectorIndex = ConnectorIndex(0);
    pub const HDMI1: ConnectorIndex = ConnectorIndex(1);
    pub const HDMI2: ConnectorIndex = ConnectorIndex(2);

    /// Last slot probed when building the uid map.
    pub const LAST: ConnectorIndex = ConnectorIndex::HDMI2;

    pub fn is_panel(self) -> bool {
        self == ConnectorIndex::PANEL
    }

    /// Every known slot, `PANEL..=LAST`.
    pub fn known() -> impl Iterator<Item = ConnectorIndex> {
        (ConnectorIndex::PANEL.0..=ConnectorIndex::LAST.0).map(ConnectorIndex)
    }
}

impl fmt::Display for ConnectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConnectorIndex::PANEL => write!(f, "panel"),
            ConnectorIndex::HDMI1 => write!(f, "hdmi1"),
            ConnectorIndex::HDMI2 => write!(f, "hdmi2"),
            ConnectorIndex(n) => write!(f, "connector {n}"),
        }
    }
}

impl FromStr for ConnectorIndex {
    type Err = String;

    /// Accepts `panel`, `hdmi1`, `hdmi2` (any case) or a bare index.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "panel" => Ok(ConnectorIndex::PANEL),
            "hdmi1" => Ok(ConnectorIndex::HDMI1),
            "hdmi2" => Ok(ConnectorIndex::HDMI2),
            other => other
                .parse::<u32>()
                .map(ConnectorIndex)
                .map_err(|_| format!("unknown connector '{s}' (expected panel, hdmi1, hdmi2 or an index)")),
        }
    }
}

// ── Error type ──

/// Display service errors.
///
/// `ServiceUnavailable` means a call into the display service itself failed
/// and nothing was changed. `QueryFailed` means one connector could not be
/// probed, typically because nothing is plugged into it.
#[derive(Debug)]
pub enum DisplayError {
    ServiceUnavailable(String),
    QueryFailed {
        connector: ConnectorIndex,
        reason: String,
    },
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::ServiceUnavailable(e) => write!(f, "Display service unavailable: {e}"),
            DisplayError::QueryFailed { connector, reason } => {
                write!(f, "EDID query failed on {connector}: {reason}")
            }
        }
    }
}

impl std::error::Error for DisplayError {}

pub type Result<T> = std::result::Result<T, DisplayError>;

// ── Trait ──

pub trait DisplayService {
    /// Identification data for the display attached to `connector`.
    fn edid_get_info(&self, connector: ConnectorIndex) -> Result<EdidInfo>;

    /// Switch `connector` to the mode at `index` in its mode list.
    fn mode_set_index(&self, connector: ConnectorIndex, index: u32) -> Result<()>;

    /// Modes supported on `connector`, in index order.
    fn modes(&self, connector: ConnectorIndex) -> Result<Vec<DisplayMode>>;
}

// ── sysfs / fbdev implementation ──

/// Display service backed by DRM EDID nodes and fbdev mode nodes.
///
/// Every node is reached through a [`ControlFiles`] capability, so a fake
/// tree stands in for `/sys` in tests.
pub struct SysfsDisplayService<'a, C: ControlFiles + ?Sized> {
    control: &'a C,
    connectors: &'a [ConnectorConfig],
}

impl<'a, C: ControlFiles + ?Sized> SysfsDisplayService<'a, C> {
    pub fn new(control: &'a C, connectors: &'a [ConnectorConfig]) -> Self {
        SysfsDisplayService {
            control,
            connectors,
        }
    }

    fn nodes(&self, connector: ConnectorIndex) -> Option<&'a ConnectorConfig> {
        self.connectors.iter().find(|c| c.index == connector.0)
    }

    /// Raw fbdev mode lines that parse, in file order. Mode indices refer to
    /// positions in this list.
    fn mode_lines(&self, nodes: &ConnectorConfig) -> Result<Vec<String>> {
        let raw = self
            .control
            .read(nodes.modes.as_ref())
            .map_err(|e| DisplayError::ServiceUnavailable(format!("{}: {e}", nodes.modes)))?;
        Ok(String::from_utf8_lossy(&raw)
            .lines()
            .map(str::trim)
            .filter(|line| modes::parse_fb_mode(line).is_some())
            .map(str::to_string)
            .collect())
    }
}

impl<C: ControlFiles + ?Sized> DisplayService for SysfsDisplayService<'_, C> {
    fn edid_get_info(&self, connector: ConnectorIndex) -> Result<EdidInfo> {
        let query_failed = |reason: String| DisplayError::QueryFailed { connector, reason };

        let nodes = self
            .nodes(connector)
            .ok_or_else(|| query_failed("connector not configured".into()))?;

        if !nodes.status.is_empty() {
            let raw = self
                .control
                .read(nodes.status.as_ref())
                .map_err(|e| query_failed(format!("{}: {e}", nodes.status)))?;
            let status = String::from_utf8_lossy(&raw);
            let status = status.trim();
            if status != "connected" {
                return Err(query_failed(format!("status is '{status}'")));
            }
        }

        if nodes.edid.is_empty() {
            return Ok(EdidInfo::default());
        }

        let raw = self
            .control
            .read(nodes.edid.as_ref())
            .map_err(|e| query_failed(format!("{}: {e}", nodes.edid)))?;
        if raw.is_empty() {
            return Err(query_failed("empty EDID".into()));
        }
        edid::parse_edid(&raw).ok_or_else(|| query_failed("malformed EDID".into()))
    }

    fn mode_set_index(&self, connector: ConnectorIndex, index: u32) -> Result<()> {
        let nodes = self.nodes(connector).ok_or_else(|| {
            DisplayError::ServiceUnavailable(format!("{connector} is not configured"))
        })?;
        let lines = self.mode_lines(nodes)?;
        let line = lines.get(index as usize).ok_or_else(|| {
            DisplayError::ServiceUnavailable(format!(
                "mode index {index} out of range ({} modes on {connector})",
                lines.len()
            ))
        })?;
        log::debug!("{connector}: writing mode '{line}' to {}", nodes.mode);
        self.control
            .write(nodes.mode.as_ref(), format!("{line}\n").as_bytes())
            .map_err(|e| DisplayError::ServiceUnavailable(format!("{}: {e}", nodes.mode)))
    }

    fn modes(&self, connector: ConnectorIndex) -> Result<Vec<DisplayMode>> {
        let nodes = self.nodes(connector).ok_or_else(|| {
            DisplayError::ServiceUnavailable(format!("{connector} is not configured"))
        })?;
        Ok(self
            .mode_lines(nodes)?
            .iter()
            .filter_map(|line| modes::parse_fb_mode(line))
            .collect())
    }
}

// ── Mock display service for testing ──

/// In-memory mock display service for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Connectors without an entry in `edids` fail their EDID query, the way
    /// an empty HDMI port does.
    #[derive(Default)]
    pub struct MockDisplayService {
        /// Attached displays: connector → EDID.
        pub edids: RefCell<HashMap<ConnectorIndex, EdidInfo>>,
        /// Mode lists per connector.
        pub mode_lists: RefCell<HashMap<ConnectorIndex, Vec<DisplayMode>>>,
        /// Recorded EDID queries, in order.
        pub edid_queries: RefCell<Vec<ConnectorIndex>>,
        /// Recorded mode-set calls: (connector, index).
        pub mode_sets: RefCell<Vec<(ConnectorIndex, u32)>>,
        /// If true, `mode_set_index` returns `ServiceUnavailable`.
        pub fail_mode_set: Cell<bool>,
    }

    impl MockDisplayService {
        pub fn new() -> Self {
            Self::default()
        }

        /// Attach a display to `connector`.
        pub fn with_display(self, connector: ConnectorIndex, edid: EdidInfo) -> Self {
            self.edids.borrow_mut().insert(connector, edid);
            self
        }

        /// Give `connector` a mode list.
        pub fn with_modes(self, connector: ConnectorIndex, modes: Vec<DisplayMode>) -> Self {
            self.mode_lists.borrow_mut().insert(connector, modes);
            self
        }
    }

    impl DisplayService for MockDisplayService {
        fn edid_get_info(&self, connector: ConnectorIndex) -> Result<EdidInfo> {
            self.edid_queries.borrow_mut().push(connector);
            self.edids
                .borrow()
                .get(&connector)
                .cloned()
                .ok_or(DisplayError::QueryFailed {
                    connector,
                    reason: "mock: nothing attached".into(),
                })
        }

        fn mode_set_index(&self, connector: ConnectorIndex, index: u32) -> Result<()> {
            if self.fail_mode_set.get() {
                return Err(DisplayError::ServiceUnavailable(
                    "mock: mode_set_index failure injected".into(),
                ));
            }
            self.mode_sets.borrow_mut().push((connector, index));
            Ok(())
        }

        fn modes(&self, connector: ConnectorIndex) -> Result<Vec<DisplayMode>> {
            Ok(self
                .mode_lists
                .borrow()
                .get(&connector)
                .cloned()
                .unwrap_or_default())
        }
    }
}
