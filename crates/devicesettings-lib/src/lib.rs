//! devicesettings — display identity, mode selection and panel/fan control.

pub mod config;
pub mod control;
pub mod display;
pub mod edid;
pub mod error;
pub mod identity;
pub mod modes;
pub mod prefs;
pub mod rotation;
pub mod settings;

pub use error::SettingsError;
pub use settings::DeviceSettings;
