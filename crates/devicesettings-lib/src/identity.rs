//! Display identity — labels, uids, the uid map and per-display mode lookup.
//!
//! A display is identified by a label derived from its EDID (or its slot when
//! the EDID carries no name) and a uid hashed from that label. The uid keys
//! the stored mode preference, so the same monitor picks up its mode again on
//! whichever connector it is plugged into.
//!
//! Every function here takes its collaborators as closures; [`crate::settings`]
//! wires them to the real services.

use std::collections::HashMap;

use crate::display::{ConnectorIndex, Result};
use crate::edid::EdidInfo;

/// Label for a panel without a monitor name.
pub const INTERNAL_PANEL_LABEL: &str = "Internal Panel";

/// Label for an external display without a monitor name.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Prefix of the preference key holding a display's mode index.
pub const MODE_PREF_PREFIX: &str = "mode_";

/// Uid → connector, rebuilt on every call.
pub type UidMap = HashMap<String, ConnectorIndex>;

/// Human-readable name for the display on `connector`.
///
/// - `"<manufacturer> - <name>"` if both are known, or just `"<name>"`
/// - `"Internal Panel"` for an unnamed panel
/// - `"Unknown"` otherwise
pub fn display_label(edid: &EdidInfo, connector: ConnectorIndex) -> String {
    if !edid.monitor_name.is_empty() {
        if edid.manufacturer_id.is_empty() {
            return edid.monitor_name.clone();
        }
        return format!("{} - {}", edid.manufacturer_id, edid.monitor_name);
    }
    if connector.is_panel() {
        return INTERNAL_PANEL_LABEL.into();
    }
    UNKNOWN_LABEL.into()
}

/// Stable identifier for the display on `connector`: the label's hash as a
/// signed decimal string.
///
/// The hash is the 31-multiplier polynomial over UTF-16 code units with
/// wrapping `i32` arithmetic, so uids match keys already present in stores
/// written by earlier device-settings releases. Two labels may collide; the
/// later connector wins in the uid map.
pub fn display_uid(edid: &EdidInfo, connector: ConnectorIndex) -> String {
    label_hash(&display_label(edid, connector)).to_string()
}

fn label_hash(label: &str) -> i32 {
    label
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Preference key for a display uid.
pub fn mode_pref_key(uid: &str) -> String {
    format!("{MODE_PREF_PREFIX}{uid}")
}

/// Probe every known connector (`PANEL..=LAST`) and map uid → connector.
///
/// Connectors whose EDID query fails are left out.
pub fn build_uid_map<Q>(query_edid: Q) -> UidMap
where
    Q: FnMut(ConnectorIndex) -> Result<EdidInfo>,
{
    build_uid_map_over(ConnectorIndex::known(), query_edid)
}

/// [`build_uid_map`] over an explicit probe sequence.
pub fn build_uid_map_over<I, Q>(connectors: I, mut query_edid: Q) -> UidMap
where
    I: IntoIterator<Item = ConnectorIndex>,
    Q: FnMut(ConnectorIndex) -> Result<EdidInfo>,
{
    let mut map = UidMap::new();
    for connector in connectors {
        match query_edid(connector) {
            Ok(edid) => {
                map.insert(display_uid(&edid, connector), connector);
            }
            Err(e) => log::debug!("skipping {connector}: {e}"),
        }
    }
    map
}

/// Parse a stored mode index. `None` for anything that is not a
/// non-negative integer.
pub fn parse_mode_index(value: &str) -> Option<u32> {
    value.parse().ok()
}

/// Mode index to use on `connector`.
///
/// The panel always uses mode 0 and is never queried. Other connectors are
/// queried for their EDID and the stored preference for the resulting uid is
/// used, defaulting to 0. A failed EDID query is returned as-is.
pub fn resolve_mode_index<Q, P>(
    connector: ConnectorIndex,
    query_edid: Q,
    lookup_pref: P,
) -> Result<u32>
where
    Q: FnOnce(ConnectorIndex) -> Result<EdidInfo>,
    P: FnOnce(&str) -> Option<String>,
{
    if connector.is_panel() {
        return Ok(0);
    }
    let edid = query_edid(connector)?;
    let key = mode_pref_key(&display_uid(&edid, connector));
    let index = match lookup_pref(&key) {
        Some(value) => parse_mode_index(&value).unwrap_or_else(|| {
            log::warn!("{connector}: ignoring stored {key} = {value:?}, using mode 0");
            0
        }),
        None => 0,
    };
    log::debug!("{connector}: {key} -> mode {index}");
    Ok(index)
}

/// Set mode `index` on `connector`, then force a rotation/layout refresh.
///
/// The refresh only happens after a successful mode set.
pub fn apply_mode<S, R>(
    connector: ConnectorIndex,
    index: u32,
    set_mode: S,
    refresh_rotation: R,
) -> Result<()>
where
    S: FnOnce(ConnectorIndex, u32) -> Result<()>,
    R: FnOnce(bool, bool),
{
    set_mode(connector, index)?;
    refresh_rotation(true, true);
    Ok(())
}
