//! EDID base-block decoding.
//!
//! Only the identification fields are decoded: the PNP manufacturer id,
//! product code, serial number and the monitor name descriptor. Timing
//! descriptors are ignored; modes come from the display service instead.

use serde::Serialize;

/// Length of an EDID base block.
pub const EDID_BLOCK_LEN: usize = 128;

const EDID_HEADER: [u8; 8] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

/// Offsets of the four 18-byte display descriptors.
const DESCRIPTOR_OFFSETS: [usize; 4] = [54, 72, 90, 108];

/// Display descriptor tag for the monitor name.
const TAG_MONITOR_NAME: u8 = 0xFC;

/// Identification data reported for one display.
///
/// Either string may be empty: internal panels frequently ship without a
/// monitor name descriptor, and some HDMI sinks report garbage vendor codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdidInfo {
    /// 3-letter PNP id, e.g. "DEL" or "SAM". Empty if not decodable.
    pub manufacturer_id: String,
    /// Monitor name descriptor text, e.g. "U2415". Empty if absent.
    pub monitor_name: String,
    pub product_code: u16,
    pub serial_number: u32,
}

impl EdidInfo {
    /// Record with just the two fields the label is derived from.
    pub fn named(manufacturer_id: &str, monitor_name: &str) -> Self {
        EdidInfo {
            manufacturer_id: manufacturer_id.into(),
            monitor_name: monitor_name.into(),
            ..EdidInfo::default()
        }
    }
}

/// Decode an EDID base block.
///
/// Returns `None` if the data is shorter than 128 bytes or the fixed header
/// does not match. Extension blocks, if present, are ignored.
pub fn parse_edid(edid: &[u8]) -> Option<EdidInfo> {
    if edid.len() < EDID_BLOCK_LEN {
        log::debug!("EDID data too short: {} bytes", edid.len());
        return None;
    }
    if edid[0..8] != EDID_HEADER {
        log::debug!("invalid EDID header: {:02X?}", &edid[0..8]);
        return None;
    }

    let manufacturer_id = decode_manufacturer_id(u16::from_be_bytes([edid[8], edid[9]]));
    let product_code = u16::from_le_bytes([edid[10], edid[11]]);
    let serial_number = u32::from_le_bytes([edid[12], edid[13], edid[14], edid[15]]);
    let monitor_name = find_monitor_name(edid);

    Some(EdidInfo {
        manufacturer_id,
        monitor_name,
        product_code,
        serial_number,
    })
}

/// Decode three 5-bit letters ('A' = 1). Returns an empty string when any
/// letter falls outside A..=Z.
fn decode_manufacturer_id(encoded: u16) -> String {
    let letters = [
        ((encoded >> 10) & 0x1F) as u8,
        ((encoded >> 5) & 0x1F) as u8,
        (encoded & 0x1F) as u8,
    ];
    if letters.iter().any(|&l| !(1..=26).contains(&l)) {
        return String::new();
    }
    letters.iter().map(|&l| (b'A' + l - 1) as char).collect()
}

fn find_monitor_name(edid: &[u8]) -> String {
    for offset in DESCRIPTOR_OFFSETS {
        let block = &edid[offset..offset + 18];
        // Display descriptors start with a zero pixel clock.
        if block[0] == 0 && block[1] == 0 && block[3] == TAG_MONITOR_NAME {
            return descriptor_text(&block[5..18]);
        }
    }
    String::new()
}

fn descriptor_text(bytes: &[u8]) -> String {
    let text: Vec<u8> = bytes
        .iter()
        .copied()
        .take_while(|&b| b != 0x0A && b != 0x00)
        .collect();
    String::from_utf8_lossy(&text).trim().to_string()
}
