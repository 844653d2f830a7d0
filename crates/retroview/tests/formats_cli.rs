use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn formats_lists_resolver_table() {
    let output = Command::new(env!("CARGO_BIN_EXE_retroview"))
        .env("RUST_LOG", "off")
        .arg("formats")
        .output()
        .expect("failed to run retroview formats");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let bgra = stdout
        .lines()
        .find(|line| line.trim_start().starts_with("bgra8 "))
        .expect("bgra8 row missing");
    assert!(bgra.contains("bpp=4"));
    assert!(bgra.contains("gpu=bgra8unorm"));
    let rgb565 = stdout
        .lines()
        .find(|line| line.trim_start().starts_with("rgb565"))
        .expect("rgb565 row missing");
    assert!(rgb565.contains("bpp=2"));
    assert!(rgb565.contains("Rgba8Unorm"));
}

#[test]
fn invalid_config_fails_before_opening_a_window() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("retroview.toml");
    fs::write(
        &config,
        "version = 1\n[presenter]\nupload_slots = 1\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_retroview"))
        .env("RUST_LOG", "off")
        .env("RETROVIEW_CONFIG_DIR", root.path())
        .env_remove("RETROVIEW_CONFIG")
        .output()
        .expect("failed to run retroview");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("upload_slots"), "{stderr}");

    let missing = Command::new(env!("CARGO_BIN_EXE_retroview"))
        .env("RUST_LOG", "off")
        .env_remove("RETROVIEW_CONFIG")
        .args(["--config"])
        .arg(root.path().join("absent.toml"))
        .output()
        .expect("failed to run retroview");
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("does not exist"));
}
