//! Single-value sysfs control nodes — panel power, OLED color mode, fan profile.
//!
//! All access goes through [`ControlFiles`] so the node tree can be replaced
//! by a mock or by a temporary directory standing in for `/sys`.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SettingsError};

/// Number of bytes read back from the color mode node.
pub const COLOR_MODE_READ_LEN: usize = 4;

/// Read/write access to kernel control nodes.
pub trait ControlFiles {
    /// Write `data` to the node at `path`, replacing its contents.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Read the full contents of the node at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Control nodes on the real filesystem.
///
/// With a root prefix, absolute node paths are resolved below it instead of
/// below `/`.
#[derive(Debug, Clone, Default)]
pub struct SysfsControl {
    root: Option<PathBuf>,
}

impl SysfsControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every node path below `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        SysfsControl {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.strip_prefix("/").unwrap_or(path)),
            None => path.to_path_buf(),
        }
    }
}

impl ControlFiles for SysfsControl {
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let path = self.resolve(path);
        log::debug!("write {} <- {:?}", path.display(), String::from_utf8_lossy(data));
        std::fs::write(&path, data)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path))
    }
}

// ── Operations ──

/// Turn the internal panel on (`"1\n"`) or off (`"0\n"`).
pub fn set_internal_display_state(
    ctl: &(impl ControlFiles + ?Sized),
    enable_path: &Path,
    on: bool,
) -> Result<()> {
    let value: &[u8] = if on { b"1\n" } else { b"0\n" };
    ctl.write(enable_path, value)?;
    Ok(())
}

/// Write an OLED color mode name. Only ASCII names are accepted.
pub fn set_panel_color_mode(
    ctl: &(impl ControlFiles + ?Sized),
    path: &Path,
    mode: &str,
) -> Result<()> {
    if !mode.is_ascii() {
        return Err(SettingsError::ControlValue(format!(
            "color mode must be ASCII, got {mode:?}"
        )));
    }
    ctl.write(path, mode.as_bytes())?;
    Ok(())
}

/// Read the current OLED color mode.
///
/// Only the first [`COLOR_MODE_READ_LEN`] bytes are considered; NUL padding
/// and trailing whitespace are stripped.
pub fn panel_color_mode(ctl: &(impl ControlFiles + ?Sized), path: &Path) -> Result<String> {
    let raw = ctl.read(path)?;
    let mut buf = [0u8; COLOR_MODE_READ_LEN];
    let n = raw.len().min(COLOR_MODE_READ_LEN);
    buf[..n].copy_from_slice(&raw[..n]);
    let text = String::from_utf8_lossy(&buf);
    Ok(text.trim_end_matches('\0').trim_end().to_string())
}

/// Write a fan profile name to every fan node, in order. Stops at the first
/// node that fails.
pub fn set_fan_profile(
    ctl: &(impl ControlFiles + ?Sized),
    paths: &[PathBuf],
    profile: &str,
) -> Result<()> {
    for path in paths {
        ctl.write(path, profile.as_bytes())?;
    }
    Ok(())
}

// ── Mock control nodes for testing ──

/// In-memory control node tree for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct MockControl {
        /// Node contents. Reads of absent nodes fail with `NotFound`.
        pub files: RefCell<HashMap<PathBuf, Vec<u8>>>,
        /// Every successful write, in order.
        pub writes: RefCell<Vec<(PathBuf, Vec<u8>)>>,
        /// If true, all writes fail with `PermissionDenied`.
        pub fail_writes: Cell<bool>,
        /// Writes to these nodes fail with `PermissionDenied`.
        pub read_only: RefCell<Vec<PathBuf>>,
    }

    impl MockControl {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a node with `data`.
        pub fn put(&self, path: impl AsRef<Path>, data: &[u8]) {
            self.files
                .borrow_mut()
                .insert(path.as_ref().to_path_buf(), data.to_vec());
        }

        /// Current contents of a node.
        pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
            self.files.borrow().get(path.as_ref()).cloned()
        }
    }

    impl ControlFiles for MockControl {
        fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            let denied = self.read_only.borrow().iter().any(|p| p.as_path() == path);
            if self.fail_writes.get() || denied {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("mock: write to {} denied", path.display()),
                ));
            }
            self.writes
                .borrow_mut()
                .push((path.to_path_buf(), data.to_vec()));
            self.put(path, data);
            Ok(())
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.contents(path).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("mock: no node at {}", path.display()),
                )
            })
        }
    }
}
