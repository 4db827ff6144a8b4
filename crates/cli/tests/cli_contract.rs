use assert_cmd::cargo::cargo_bin_cmd;
use image::{ImageFormat, RgbaImage};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

fn write_image(dir: &Path, name: &str, format: ImageFormat, width: u32, height: u32) -> PathBuf {
    let image = RgbaImage::from_pixel(width, height, image::Rgba([40, 80, 120, 255]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).expect("image should encode");

    let path = dir.join(name);
    fs::write(&path, bytes).expect("fixture should be written");
    path
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout should contain valid json")
}

#[test]
fn identify_reports_format_per_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let png = write_image(temp.path(), "a.png", ImageFormat::Png, 4, 4);
    let gif = write_image(temp.path(), "b.gif", ImageFormat::Gif, 4, 4);
    let junk = temp.path().join("c.bin");
    fs::write(&junk, b"\x00\x11\x22\x33").unwrap();

    let output = cargo_bin_cmd!("sharedimg-cli")
        .arg("identify")
        .arg(&png)
        .arg(&gif)
        .arg(&junk)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    let formats: Vec<&str> =
        value.as_array().unwrap().iter().map(|v| v["format"].as_str().unwrap()).collect();
    assert_eq!(formats, vec!["png", "gif", "unknown"]);
}

#[test]
fn info_emits_dimensions_and_state() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let bmp = write_image(temp.path(), "wide.bmp", ImageFormat::Bmp, 12, 3);

    let output = cargo_bin_cmd!("sharedimg-cli")
        .arg("info")
        .arg(&bmp)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    let entry = &value[0];
    assert_eq!(entry["format"], "bmp");
    assert_eq!(entry["width"], 12);
    assert_eq!(entry["height"], 3);
    assert_eq!(entry["state"], "measured");
}

#[test]
fn info_reports_failed_for_unreadable_image() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let junk = temp.path().join("broken.png");
    fs::write(&junk, b"not really a png").unwrap();

    let output = cargo_bin_cmd!("sharedimg-cli")
        .arg("info")
        .arg(&junk)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value[0]["width"], 0);
    assert_eq!(value[0]["height"], 0);
    assert_eq!(value[0]["state"], "failed");
}

#[test]
fn simulate_evicts_under_budget() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let first = write_image(temp.path(), "first.png", ImageFormat::Png, 10, 6);
    let second = write_image(temp.path(), "second.png", ImageFormat::Png, 10, 6);

    let output = cargo_bin_cmd!("sharedimg-cli")
        .arg("simulate")
        .arg("--limit")
        .arg("100")
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["memory_limit"], 100);
    assert_eq!(value["memory_used"], 60);
    assert_eq!(value["evictions"], 1);
    assert_eq!(value["decodes"], 2);
    assert_eq!(value["pixels_drawn"], 120);
    assert_eq!(value["entries"][0]["state"], "measured");
    assert_eq!(value["entries"][1]["state"], "decoded");
}

#[test]
fn simulate_reads_relative_paths_from_working_directory() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let elsewhere = tempfile::tempdir().expect("temp dir should be created");
    write_image(temp.path(), "near.png", ImageFormat::Png, 3, 4);

    let output = cargo_bin_cmd!("sharedimg-cli")
        .current_dir(temp.path())
        .env("SHARED_IMAGE_ROOT", elsewhere.path())
        .arg("simulate")
        .arg("--limit")
        .arg("0")
        .arg("near.png")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["entries"][0]["path"], "near.png");
    assert_eq!(value["entries"][0]["state"], "decoded");
    assert_eq!(value["entries"][0]["width"], 3);
    assert_eq!(value["memory_used"], 12);
}

#[test]
fn simulate_reads_limit_from_config_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let image = write_image(temp.path(), "only.gif", ImageFormat::Gif, 5, 5);
    let config = temp.path().join("cache.toml");
    fs::write(&config, "memory_limit = 1000\n").unwrap();

    let output = cargo_bin_cmd!("sharedimg-cli")
        .arg("simulate")
        .arg("--config")
        .arg(&config)
        .arg(&image)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value = stdout_json(&output);
    assert_eq!(value["memory_limit"], 1000);
    assert_eq!(value["memory_used"], 25);
    assert_eq!(value["entry_count"], 1);
}

#[test]
fn simulate_fails_for_invalid_config() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let image = write_image(temp.path(), "only.png", ImageFormat::Png, 2, 2);
    let config = temp.path().join("cache.toml");
    fs::write(&config, "memory_limit = \"lots\"\n").unwrap();

    cargo_bin_cmd!("sharedimg-cli")
        .arg("simulate")
        .arg("--config")
        .arg(&config)
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("sharedimg-cli")
        .arg("info")
        .arg(temp.path().join("missing.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("sharedimg-cli")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
