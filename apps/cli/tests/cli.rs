//! CLI 集成测试
//!
//! 每个测试通过 `DEPTHCAP_CONFIG` 使用独立的配置文件。

use assert_cmd::Command;
use depthcap_sensor::{Codec, ContainerHeader, ContainerWriter, FrameRecord};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("depthcap-cli").unwrap();
    cmd.env("DEPTHCAP_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_container(path: &Path, frames: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let header = ContainerHeader {
        codec: Codec::H265,
        width: 4,
        height: 3,
        fps: 30,
        camera_serial: 50918724,
        created_unix: 0,
    };
    let mut writer = ContainerWriter::create(path, header).unwrap();
    for i in 0..frames {
        writer
            .append(&FrameRecord {
                timestamp_us: i,
                bgra: vec![i as u8; 4 * 3 * 4],
                depth_mm: vec![f32::NAN; 4 * 3],
            })
            .unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_extract_missing_raw_folder() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();

    cli(&config)
        .arg("extract")
        .arg(data.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Raw folder not found"));
}

#[test]
fn test_extract_no_containers() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    fs::create_dir_all(data.path().join("raw")).unwrap();

    cli(&config)
        .arg("extract")
        .arg(data.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No .dcap files found"));
}

#[test]
fn test_extract_writes_sampled_frames() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_container(&data.path().join("raw/A1.dcap"), 45);

    cli(&config)
        .arg("extract")
        .arg(data.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("A1"));

    let images = data.path().join("samples/A1/images");
    let depth = data.path().join("samples/A1/depth");
    for stem in ["000000", "000020", "000040"] {
        assert!(images.join(format!("{stem}.png")).is_file());
        assert!(depth.join(format!("{stem}.npy")).is_file());
    }
    assert!(!images.join("000001.png").exists());
}

#[test]
fn test_extract_color_only_with_stride() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_container(&data.path().join("raw/B1.dcap"), 10);

    cli(&config)
        .args(["extract", "--no-depth", "--stride", "5"])
        .arg(data.path())
        .assert()
        .success();

    assert!(data.path().join("samples/B1/images/000005.png").is_file());
    assert!(!data.path().join("samples/B1/depth").exists());
}

#[test]
fn test_extract_rejects_zero_stride() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_container(&data.path().join("raw/A1.dcap"), 3);

    cli(&config)
        .args(["extract", "--stride", "0"])
        .arg(data.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("stride"));
}

#[test]
fn test_extract_uses_configured_root() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_container(&data.path().join("raw/C1.dcap"), 1);

    cli(&config)
        .args(["config", "set", "root"])
        .arg(data.path())
        .assert()
        .success();

    cli(&config).arg("extract").assert().success();
    assert!(data.path().join("samples/C1/images/000000.png").is_file());
}

#[test]
fn test_orphans_reported() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    write_container(&data.path().join("raw/A1.dcap"), 1);
    write_container(&data.path().join("raw/B2.dcap"), 1);
    fs::create_dir_all(data.path().join("labels")).unwrap();
    fs::write(data.path().join("labels/A1.json"), "{}").unwrap();

    cli(&config)
        .arg("orphans")
        .arg(data.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("raw/B2.dcap").and(predicate::str::contains("raw/A1.dcap").not()));

    assert!(data.path().join("raw/B2.dcap").exists());
}

#[test]
fn test_devices_lists_sim_camera() {
    let config = TempDir::new().unwrap();

    cli(&config)
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("10000001"));
}

#[test]
fn test_record_unknown_camera_fails_before_creating_files() {
    let config = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let root = data.path().join("dataset");

    cli(&config)
        .args(["record", "--camera", "ZEDXMini_SN50918724", "--duration", "1", "--root"])
        .arg(&root)
        .assert()
        .failure()
        .stderr(predicate::str::contains("50918724 not found"));

    assert!(!root.exists());
}

#[test]
fn test_record_camera_without_serial() {
    let config = TempDir::new().unwrap();

    cli(&config)
        .args(["record", "--camera", "ZEDXMini"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid camera selector"));
}

#[test]
fn test_config_set_get_path() {
    let config = TempDir::new().unwrap();
    let config_path = config.path().join("config.toml");

    cli(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(config_path.to_string_lossy().as_ref()));

    cli(&config)
        .args(["config", "set", "measurement_fields", "mass_g,length_mm"])
        .assert()
        .success();
    cli(&config)
        .args(["config", "get", "measurement_fields"])
        .assert()
        .success()
        .stdout("mass_g,length_mm\n");

    let saved = fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("measurement_fields"));

    cli(&config).args(["config", "set", "colour", "red"]).assert().failure();
    cli(&config).args(["config", "set", "backend", "zed"]).assert().failure();
}

#[test]
fn test_malformed_config_is_an_error() {
    let config = TempDir::new().unwrap();
    fs::write(config.path().join("config.toml"), "stride = \"twenty\"").unwrap();

    cli(&config)
        .arg("devices")
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed config file"));
}

#[test]
fn test_unknown_backend_rejected() {
    let config = TempDir::new().unwrap();

    cli(&config)
        .args(["--backend", "zed", "devices"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported backend"));

    cli(&config).args(["--sim", "devices"]).assert().success();
}
