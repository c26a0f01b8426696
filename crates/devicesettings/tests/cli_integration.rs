//! Integration tests for the `devicesettings` binary.
//!
//! These tests exercise the CLI binary via `assert_cmd`, against a fake sysfs
//! tree in a temporary directory selected through `--config`.

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn cli() -> assert_cmd::Command {
    cargo_bin_cmd!("devicesettings")
}

/// A temp directory holding a fake `/sys`, `config.toml` and `prefs.json`.
struct FakeDevice {
    dir: tempfile::TempDir,
}

impl FakeDevice {
    fn new() -> Self {
        let dev = FakeDevice {
            dir: tempfile::tempdir().unwrap(),
        };
        dev.put("sys/class/graphics/fb0/modes", b"U:1920x1200p-60\n");
        dev.put("sys/class/graphics/fb0/mode", b"");
        dev.put("sys/class/drm/card0-HDMI-A-1/status", b"connected\n");
        dev.put("sys/class/drm/card0-HDMI-A-1/edid", &dell_u2415_edid());
        dev.put(
            "sys/class/graphics/fb1/modes",
            b"U:1920x1200p-60\nD:1920x1080p-60\nD:1280x720p-60\n",
        );
        dev.put("sys/class/graphics/fb1/mode", b"");
        dev.put("sys/class/drm/card0-HDMI-A-2/status", b"disconnected\n");
        dev.put("sys/class/graphics/fb2/modes", b"");
        dev.put("sys/bus/platform/devices/tegradc.0/enable", b"1\n");
        dev.put("sys/devices/50000000.host1x/tegradc.0/panel_color_mode", b"0\n");
        dev.put("sys/devices/pwm-fan/fan_profile", b"");
        dev.put("sys/devices/thermal-fan-est/fan_profile", b"");

        let config = format!(
            "sysfs_root = \"{}\"\npreferences_path = \"{}\"\n",
            dev.root().display(),
            dev.prefs_path().display()
        );
        std::fs::write(dev.config_path(), config).unwrap();
        dev
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn config_path(&self) -> PathBuf {
        self.root().join("config.toml")
    }

    fn prefs_path(&self) -> PathBuf {
        self.root().join("prefs.json")
    }

    fn put(&self, node: &str, data: &[u8]) {
        let path = self.root().join(node);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn read(&self, node: &str) -> String {
        std::fs::read_to_string(self.root().join(node)).unwrap_or_default()
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cli();
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}

fn dell_u2415_edid() -> Vec<u8> {
    let mut edid = vec![0u8; 128];
    edid[0..8].copy_from_slice(&[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00]);
    edid[8..10].copy_from_slice(&[0x10, 0xAC]);
    edid[72 + 3] = 0xFC;
    edid[72 + 5..72 + 18].copy_from_slice(b"U2415\n       ");
    edid
}

#[test]
fn cli_help_succeeds() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("devicesettings"));
}

#[test]
fn cli_version_prints_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_config_json_produces_valid_json() {
    let dev = FakeDevice::new();
    let output = dev
        .cmd()
        .args(["--json", "config"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value =
        serde_json::from_slice(&output).expect("config --json should produce valid JSON");
    assert!(json["settings"].is_object());
    assert_eq!(json["config_file_exists"], true);
    assert_eq!(json["settings"]["connectors"].as_array().unwrap().len(), 3);
    assert_eq!(
        json["files"]["preferences"],
        dev.prefs_path().display().to_string()
    );
}

#[test]
fn cli_config_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("--config")
        .arg(dir.path().join("none.toml"))
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found, using defaults"));
}

#[test]
fn cli_config_init_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devicesettings").join("config.toml");
    cli()
        .arg("--config")
        .arg(&path)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("# devicesettings configuration"));
    assert!(contents.contains("tegradc.0/enable"));

    cli()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("(loaded)"))
        .stdout(predicate::str::contains("Problems:").not());
}

#[test]
fn cli_config_init_keeps_existing_file_without_force() {
    let dev = FakeDevice::new();
    let before = std::fs::read_to_string(dev.config_path()).unwrap();
    dev.cmd()
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    assert_eq!(std::fs::read_to_string(dev.config_path()).unwrap(), before);

    dev.cmd().args(["config", "--init", "--force"]).assert().success();
    let after = std::fs::read_to_string(dev.config_path()).unwrap();
    assert!(after.contains(&dev.root().display().to_string()));
    assert!(after.contains("fan_profile_paths"));
}

#[test]
fn cli_config_lists_stored_modes() {
    let dev = FakeDevice::new();
    dev.cmd().args(["select-mode", "hdmi1", "1"]).assert().success();
    dev.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("mode_-321234733 = 1"));

    let output = dev
        .cmd()
        .args(["--json", "config"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["files"]["stored"]["mode_-321234733"], "1");
}

// ── --verbose flag ──

#[test]
fn cli_verbose_flag_accepted() {
    let dev = FakeDevice::new();
    dev.cmd().args(["-v", "config"]).assert().success();
}

#[test]
fn cli_verbose_long_flag_accepted() {
    let dev = FakeDevice::new();
    dev.cmd().args(["--verbose", "config"]).assert().success();
}

// ── Display commands ──

#[test]
fn cli_displays_lists_attached_displays() {
    let dev = FakeDevice::new();
    dev.cmd()
        .arg("displays")
        .assert()
        .success()
        .stdout(predicate::str::contains("Internal Panel"))
        .stdout(predicate::str::contains("DEL - U2415"))
        .stdout(predicate::str::contains("-321234733"));
}

#[test]
fn cli_displays_json() {
    let dev = FakeDevice::new();
    let output = dev
        .cmd()
        .args(["--json", "displays"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["count"], 2);
    assert_eq!(json["displays"][1]["connector"], 1);
    assert_eq!(json["displays"][1]["uid"], "-321234733");
}

#[test]
fn cli_modes_lists_descriptions() {
    let dev = FakeDevice::new();
    dev.cmd()
        .args(["modes", "hdmi1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1920x1080 60Hz"))
        .stdout(predicate::str::contains("RGB 8-bit Rec. 709"));
}

#[test]
fn cli_select_mode_applies_and_persists() {
    let dev = FakeDevice::new();
    dev.cmd()
        .args(["select-mode", "hdmi1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mode 2 applied (1280x720 60Hz)"));

    assert_eq!(dev.read("sys/class/graphics/fb1/mode"), "D:1280x720p-60\n");
    let prefs: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dev.prefs_path()).unwrap()).unwrap();
    assert_eq!(prefs["mode_-321234733"], "2");

    // set-mode re-applies the stored choice.
    dev.put("sys/class/graphics/fb1/mode", b"");
    dev.cmd().args(["set-mode", "1"]).assert().success();
    assert_eq!(dev.read("sys/class/graphics/fb1/mode"), "D:1280x720p-60\n");
}

#[test]
fn cli_select_mode_out_of_range_fails() {
    let dev = FakeDevice::new();
    dev.cmd()
        .args(["select-mode", "hdmi1", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
    assert!(!dev.prefs_path().exists());
}

#[test]
fn cli_set_mode_on_disconnected_port_fails() {
    let dev = FakeDevice::new();
    dev.cmd()
        .args(["set-mode", "hdmi2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    assert_eq!(dev.read("sys/class/graphics/fb2/mode"), "");
}

#[test]
fn cli_select_mode_keeps_unreadable_preferences() {
    let dev = FakeDevice::new();
    let mut original = br#"{"mode_111": "2", "note": ""#.to_vec();
    original.push(0xFF);
    original.extend_from_slice(br#""}"#);
    std::fs::write(dev.prefs_path(), &original).unwrap();

    dev.cmd()
        .args(["select-mode", "hdmi1", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("preferences read error"));
    assert_eq!(std::fs::read(dev.prefs_path()).unwrap(), original);
    assert_eq!(dev.read("sys/class/graphics/fb1/mode"), "");
}

#[test]
fn cli_rejects_unknown_connector() {
    let dev = FakeDevice::new();
    dev.cmd()
        .args(["set-mode", "dp1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown connector"));
}

// ── Control node commands ──

#[test]
fn cli_panel_off_writes_node() {
    let dev = FakeDevice::new();
    dev.cmd()
        .args(["panel", "off"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Panel: OFF"));
    assert_eq!(dev.read("sys/bus/platform/devices/tegradc.0/enable"), "0\n");
}

#[test]
fn cli_color_mode_set_and_show() {
    let dev = FakeDevice::new();
    dev.cmd().args(["color-mode", "2"]).assert().success();
    let output = dev
        .cmd()
        .args(["--json", "color-mode"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["color_mode"], "2");
}

#[test]
fn cli_fan_profile_writes_both_nodes() {
    let dev = FakeDevice::new();
    dev.cmd().args(["fan-profile", "quiet"]).assert().success();
    assert_eq!(dev.read("sys/devices/pwm-fan/fan_profile"), "quiet");
    assert_eq!(dev.read("sys/devices/thermal-fan-est/fan_profile"), "quiet");
}

#[test]
fn cli_invalid_config_is_reported() {
    let dev = FakeDevice::new();
    std::fs::write(dev.config_path(), "panel_enable_path = \"relative/enable\"\n").unwrap();
    dev.cmd()
        .args(["panel", "on"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config error"));
}

// ── Subcommand help ──

#[test]
fn cli_select_mode_help_succeeds() {
    cli()
        .args(["select-mode", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode index"));
}
