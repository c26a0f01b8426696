//! Display mode records and their human-readable descriptions.

use std::fmt;

use serde::Serialize;

/// Pixel encoding of a display mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelEncoding {
    #[default]
    Rgb,
    Yuv444,
    Yuv422,
    Yuv420,
}

impl fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelEncoding::Rgb => write!(f, "RGB"),
            PixelEncoding::Yuv444 => write!(f, "YUV444"),
            PixelEncoding::Yuv422 => write!(f, "YUV422"),
            PixelEncoding::Yuv420 => write!(f, "YUV420"),
        }
    }
}

/// Colorimetry of a display mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Colorimetry {
    #[default]
    #[serde(rename = "rec709")]
    Rec709,
    #[serde(rename = "rec2020")]
    Rec2020,
}

impl fmt::Display for Colorimetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Colorimetry::Rec709 => write!(f, "Rec. 709"),
            Colorimetry::Rec2020 => write!(f, "Rec. 2020"),
        }
    }
}

/// One mode supported by a connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMode {
    pub xres: u32,
    pub yres: u32,
    /// Refresh rate in Hz.
    pub refresh: f32,
    pub pixel_encoding: PixelEncoding,
    /// Bits per color component.
    pub bpc: u8,
    pub colorimetry: Colorimetry,
}

impl DisplayMode {
    /// An 8-bit RGB Rec. 709 mode.
    pub fn rgb(xres: u32, yres: u32, refresh: f32) -> Self {
        DisplayMode {
            xres,
            yres,
            refresh,
            pixel_encoding: PixelEncoding::Rgb,
            bpc: 8,
            colorimetry: Colorimetry::Rec709,
        }
    }
}

/// `"1920x1080 60Hz"` style description.
pub fn mode_info_string(mode: &DisplayMode) -> String {
    format!("{}x{} {}Hz", mode.xres, mode.yres, format_refresh(mode.refresh))
}

/// `"RGB 8-bit Rec. 709"` style description.
pub fn color_info_string(mode: &DisplayMode) -> String {
    format!("{} {}-bit {}", mode.pixel_encoding, mode.bpc, mode.colorimetry)
}

/// At most two decimals, trailing zeros dropped: 60 -> "60", 59.94 -> "59.94".
fn format_refresh(refresh: f32) -> String {
    let s = format!("{refresh:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Parse an fbdev mode line as found in `/sys/class/graphics/fbN/modes`.
///
/// Format: `<T>:<W>x<H><s>-<R>` where `T` is the mode source tag (`U`, `S`,
/// `D`, `V`), `s` the scan type (`p`, `i`, `d`) and `R` the integer refresh
/// rate, e.g. `U:1920x1080p-60`. fbdev carries no color information, so the
/// result is always 8-bit RGB Rec. 709.
pub fn parse_fb_mode(line: &str) -> Option<DisplayMode> {
    let (tag, rest) = line.trim().split_once(':')?;
    if tag.len() != 1 {
        return None;
    }
    let (geometry, refresh) = rest.split_once('-')?;
    let (xres, yres_scan) = geometry.split_once('x')?;
    let yres = yres_scan.trim_end_matches(['p', 'i', 'd']);
    if yres.len() == yres_scan.len() {
        return None;
    }
    Some(DisplayMode::rgb(
        xres.parse().ok()?,
        yres.parse().ok()?,
        refresh.parse::<u32>().ok()? as f32,
    ))
}
