//! Unified error type for the devicesettings-lib crate.
//!
//! [`SettingsError`] wraps module-specific errors (`DisplayError`) and
//! domain-specific error kinds (`Config`, `Preferences`, `ControlValue`).
//! `From` impls allow `?` to propagate across module boundaries seamlessly.

use std::fmt;

use crate::display::DisplayError;

/// Unified error type for devicesettings-lib operations.
#[derive(Debug)]
pub enum SettingsError {
    /// Display service error (EDID query, mode set).
    Display(DisplayError),
    /// Standard I/O error (control node write/read, config or preference persistence).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
    /// Preference store error (serialization, missing directory).
    Preferences(String),
    /// A value that cannot be written to a control node.
    ControlValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Display(e) => write!(f, "{e}"),
            SettingsError::Io(e) => write!(f, "I/O error: {e}"),
            SettingsError::Config(e) => write!(f, "Config error: {e}"),
            SettingsError::Preferences(e) => write!(f, "Preferences error: {e}"),
            SettingsError::ControlValue(e) => write!(f, "Invalid control value: {e}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Display(e) => Some(e),
            SettingsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DisplayError> for SettingsError {
    fn from(e: DisplayError) -> Self {
        SettingsError::Display(e)
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

/// Crate-level Result alias using [`SettingsError`].
pub type Result<T> = std::result::Result<T, SettingsError>;
