//! String key-value preference store.
//!
//! Holds the per-display mode choices (`mode_<uid>` → index). The store is
//! written by the selection side only; mode application just reads it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Result, SettingsError};

/// File name of the preference store inside the config directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

pub trait PreferenceStore {
    /// Stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ── JSON file store ──

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Preferences persisted as a flat JSON object.
///
/// The whole file is read on open and rewritten atomically on every `set`.
/// A file that exists but cannot be loaded is never rewritten.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    values: RefCell<JsonMap>,
    /// Why the existing file could not be loaded, if it couldn't.
    load_error: Option<String>,
}

impl FilePreferenceStore {
    /// Default location, next to `config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        Config::dir().map(|d| d.join(PREFERENCES_FILE))
    }

    /// Open the store at `path`, logging any load warnings.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let (store, warnings) = Self::open_with_warnings(path);
        for w in &warnings {
            log::warn!("{w}");
        }
        store
    }

    /// Open the store at `path`.
    ///
    /// A missing file gives an empty store. A file that cannot be read or
    /// parsed gives an empty, read-only store plus a warning. Values that are
    /// not strings, numbers or booleans are reported but kept in the file.
    pub fn open_with_warnings(path: impl Into<PathBuf>) -> (Self, Vec<String>) {
        let path = path.into();
        let mut warnings = Vec::new();
        let loaded = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<JsonMap>(&contents)
                .map_err(|e| format!("preferences parse error ({}): {e}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(JsonMap::new()),
            Err(e) => Err(format!("preferences read error ({}): {e}", path.display())),
        };
        let (values, load_error) = match loaded {
            Ok(values) => {
                for (key, value) in &values {
                    if as_text(value).is_none() {
                        warnings.push(format!(
                            "preference '{key}' ignored: unsupported value {value}"
                        ));
                    }
                }
                (values, None)
            }
            Err(reason) => {
                warnings.push(format!("{reason}; starting empty, file left untouched"));
                (JsonMap::new(), Some(reason))
            }
        };
        let store = FilePreferenceStore {
            path,
            values: RefCell::new(values),
            load_error,
        };
        (store, warnings)
    }

    /// All readable entries, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .values
            .borrow()
            .iter()
            .filter_map(|(k, v)| as_text(v).map(|t| (k.clone(), t)))
            .collect();
        entries.sort();
        entries
    }

    /// Write the store atomically (temp file, then rename).
    fn save(&self, values: &JsonMap) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(values)
            .map_err(|e| SettingsError::Preferences(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &contents)?;
        if std::fs::rename(&tmp, &self.path).is_err() {
            // Rename can fail across filesystems; fall back to direct write + cleanup
            let result = std::fs::write(&self.path, &contents);
            let _ = std::fs::remove_file(&tmp);
            result?;
        }
        Ok(())
    }
}

/// String form of a stored value. Numbers and booleans are accepted.
fn as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).and_then(as_text)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(reason) = &self.load_error {
            return Err(SettingsError::Preferences(format!(
                "not overwriting unreadable store: {reason}"
            )));
        }
        let mut updated = self.values.borrow().clone();
        updated.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        self.save(&updated)?;
        *self.values.borrow_mut() = updated;
        log::debug!("preference {key} = {value}");
        Ok(())
    }
}

// ── In-memory store ──

/// Preferences that live only as long as the value.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
