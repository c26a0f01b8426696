//! Integration tests: mode selection and control nodes against a fake sysfs tree.
//!
//! A temporary directory stands in for `/sys`; the real sysfs display service,
//! control files and JSON preference store run on top of it.

use std::path::{Path, PathBuf};

use devicesettings_lib::config::Config;
use devicesettings_lib::control::SysfsControl;
use devicesettings_lib::display::{ConnectorIndex, DisplayService, SysfsDisplayService};
use devicesettings_lib::prefs::{FilePreferenceStore, PreferenceStore};
use devicesettings_lib::rotation::mock::MockRefresher;
use devicesettings_lib::settings::{ControlNodes, DeviceSettings};
use devicesettings_lib::{SettingsError, identity};

/// Minimal EDID base block with a monitor name descriptor.
fn edid(vendor: u16, name: &str) -> Vec<u8> {
    let mut edid = vec![0u8; 128];
    edid[0..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
    edid[8..10].copy_from_slice(&vendor.to_be_bytes());
    edid[54 + 3] = 0xFC;
    let text = &mut edid[54 + 5..54 + 18];
    text.fill(b' ');
    text[..name.len()].copy_from_slice(name.as_bytes());
    text[name.len()] = 0x0A;
    edid
}

fn put(root: &Path, node: &str, data: &[u8]) {
    let path = root.join(node.trim_start_matches('/'));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn read(root: &Path, node: &str) -> Vec<u8> {
    std::fs::read(root.join(node.trim_start_matches('/'))).unwrap_or_default()
}

/// Panel on fb0, a Dell on HDMI-A-1, nothing on HDMI-A-2.
fn fake_sysfs(root: &Path, config: &Config) {
    put(root, "/sys/class/graphics/fb0/modes", b"U:1920x1200p-60\n");
    put(root, "/sys/class/graphics/fb0/mode", b"");

    put(root, "/sys/class/drm/card0-HDMI-A-1/status", b"connected\n");
    put(root, "/sys/class/drm/card0-HDMI-A-1/edid", &edid(0x10AC, "U2415"));
    put(
        root,
        "/sys/class/graphics/fb1/modes",
        b"U:1920x1200p-60\nD:1920x1080p-60\nD:1280x720p-60\n",
    );
    put(root, "/sys/class/graphics/fb1/mode", b"");

    put(root, "/sys/class/drm/card0-HDMI-A-2/status", b"disconnected\n");
    put(root, "/sys/class/graphics/fb2/modes", b"");

    put(root, &config.panel_enable_path, b"1\n");
    put(root, &config.panel_color_mode_path, b"0\n");
    for path in &config.fan_profile_paths {
        put(root, path, b"");
    }
}

struct Rig {
    dir: tempfile::TempDir,
    config: Config,
    control: SysfsControl,
    prefs_path: PathBuf,
    rotation: MockRefresher,
}

impl Rig {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        fake_sysfs(dir.path(), &config);
        let control = SysfsControl::with_root(dir.path());
        let prefs_path = dir.path().join("prefs.json");
        Rig {
            dir,
            config,
            control,
            prefs_path,
            rotation: MockRefresher::new(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Build the service stack over `rig` and hand it to `f`.
fn with_settings<T>(rig: &Rig, f: impl FnOnce(&DeviceSettings<'_>) -> T) -> T {
    let display = SysfsDisplayService::new(&rig.control, &rig.config.connectors);
    let prefs = FilePreferenceStore::open(&rig.prefs_path);
    let settings = DeviceSettings::new(
        &display,
        &rig.rotation,
        &prefs,
        &rig.control,
        ControlNodes::from_config(&rig.config),
    );
    f(&settings)
}

#[test]
fn select_mode_writes_fbdev_node_and_persists() {
    let rig = Rig::new();
    with_settings(&rig, |s| s.select_display_mode(ConnectorIndex::HDMI1, 1)).unwrap();

    assert_eq!(
        read(rig.root(), "/sys/class/graphics/fb1/mode"),
        b"D:1920x1080p-60\n"
    );
    assert_eq!(*rig.rotation.calls.borrow(), vec![(true, true)]);

    // The choice survives a fresh store and is keyed by the display uid.
    let prefs = FilePreferenceStore::open(&rig.prefs_path);
    assert_eq!(prefs.get("mode_-321234733").as_deref(), Some("1"));
}

#[test]
fn set_mode_reapplies_stored_choice() {
    let rig = Rig::new();
    FilePreferenceStore::open(&rig.prefs_path)
        .set("mode_-321234733", "2")
        .unwrap();

    let applied = with_settings(&rig, |s| s.set_display_mode(ConnectorIndex::HDMI1)).unwrap();
    assert_eq!(applied, 2);
    assert_eq!(
        read(rig.root(), "/sys/class/graphics/fb1/mode"),
        b"D:1280x720p-60\n"
    );
}

#[test]
fn malformed_preference_falls_back_to_first_mode() {
    let rig = Rig::new();
    std::fs::write(&rig.prefs_path, r#"{"mode_-321234733": "wide"}"#).unwrap();

    let applied = with_settings(&rig, |s| s.set_display_mode(ConnectorIndex::HDMI1)).unwrap();
    assert_eq!(applied, 0);
    assert_eq!(
        read(rig.root(), "/sys/class/graphics/fb1/mode"),
        b"U:1920x1200p-60\n"
    );
}

#[test]
fn disconnected_port_is_left_alone() {
    let rig = Rig::new();
    let err = with_settings(&rig, |s| s.set_display_mode(ConnectorIndex::HDMI2)).unwrap_err();
    assert!(matches!(err, SettingsError::Display(_)));
    assert!(rig.rotation.calls.borrow().is_empty());
    assert!(!rig.root().join("sys/class/graphics/fb2/mode").exists());
}

#[test]
fn stored_index_beyond_mode_list_fails_without_refresh() {
    let rig = Rig::new();
    FilePreferenceStore::open(&rig.prefs_path)
        .set("mode_-321234733", "9")
        .unwrap();

    let err = with_settings(&rig, |s| s.set_display_mode(ConnectorIndex::HDMI1)).unwrap_err();
    assert!(err.to_string().contains("out of range"), "got: {err}");
    assert!(read(rig.root(), "/sys/class/graphics/fb1/mode").is_empty());
    assert!(rig.rotation.calls.borrow().is_empty());
}

#[test]
fn uid_map_lists_attached_displays() {
    let rig = Rig::new();
    let map = with_settings(&rig, |s| s.uid_map());
    assert_eq!(map.len(), 2);
    assert_eq!(map["-2046558495"], ConnectorIndex::PANEL);
    assert_eq!(map["-321234733"], ConnectorIndex::HDMI1);

    let displays = with_settings(&rig, |s| s.displays());
    let labels: Vec<_> = displays.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["Internal Panel", "DEL - U2415"]);
}

#[test]
fn uid_map_matches_identity_functions() {
    let rig = Rig::new();
    let display = SysfsDisplayService::new(&rig.control, &rig.config.connectors);
    let direct = identity::build_uid_map(|c| display.edid_get_info(c));
    assert_eq!(direct, with_settings(&rig, |s| s.uid_map()));
}

#[test]
fn control_nodes_round_trip_through_files() {
    let rig = Rig::new();
    with_settings(&rig, |s| {
        s.set_internal_display_state(false).unwrap();
        s.set_panel_color_mode("1").unwrap();
        assert_eq!(s.panel_color_mode().unwrap(), "1");
        s.set_fan_profile("cool").unwrap();
    });

    assert_eq!(read(rig.root(), &rig.config.panel_enable_path), b"0\n");
    for path in &rig.config.fan_profile_paths {
        assert_eq!(read(rig.root(), path), b"cool");
    }
}

#[test]
fn missing_fan_node_reports_io_error() {
    let rig = Rig::new();
    std::fs::remove_dir_all(rig.root().join("sys/devices/thermal-fan-est")).unwrap();

    let err = with_settings(&rig, |s| s.set_fan_profile("quiet")).unwrap_err();
    assert!(matches!(err, SettingsError::Io(_)));
    // The first node was still written.
    assert_eq!(read(rig.root(), &rig.config.fan_profile_paths[0]), b"quiet");
}
