//! Smoke tests for argument parsing and `check-config`.

use assert_cmd::Command;

fn bridge_cmd() -> Command {
    Command::cargo_bin("mattermost-bridge").expect("binary built")
}

#[test]
fn help_lists_subcommands() {
    let output = bridge_cmd().arg("--help").output().expect("run --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("start"));
    assert!(stdout.contains("check-config"));
}

#[test]
fn check_config_accepts_a_complete_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bridge.toml");
    std::fs::write(
        &path,
        r#"
        api_url = "https://chat.example.com"
        ws_url = "wss://chat.example.com"
        auth_token = "tok"
        name = "office"
        "#,
    )
    .expect("write config");

    let output = bridge_cmd()
        .arg("check-config")
        .env("BRIDGE_CONFIG_PATH", &path)
        .output()
        .expect("run check-config");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("configuration OK"));
    assert!(stdout.contains("office"));
}

#[test]
fn check_config_rejects_missing_auth_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bridge.toml");
    std::fs::write(
        &path,
        r#"
        api_url = "https://chat.example.com"
        ws_url = "wss://chat.example.com"
        "#,
    )
    .expect("write config");

    let output = bridge_cmd()
        .arg("check-config")
        .env("BRIDGE_CONFIG_PATH", &path)
        .env_remove("BRIDGE_AUTH_TOKEN")
        .output()
        .expect("run check-config");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("auth_token"));
}
