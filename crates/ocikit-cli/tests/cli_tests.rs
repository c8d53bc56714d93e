//! Integration tests for the `ocikit` CLI binary.
//!
//! These tests run the binary as a subprocess and verify exit codes and
//! output. No live services are required — commands that would reach the
//! network are given unresolvable coordinates and asserted on how they fail.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::process::Command;

/// Helper: locate the `ocikit` binary built by `cargo test`.
fn ocikit_bin() -> String {
    let path = env!("CARGO_BIN_EXE_ocikit");
    assert!(Path::new(path).exists(), "ocikit binary not found at {path}");
    path.to_owned()
}

/// Helper: run ocikit with args in a scratch directory and return
/// (`exit_code`, stdout, stderr). All ocikit env vars are cleared.
fn run_in(dir: &Path, args: &[&str], envs: &[(&str, &str)]) -> (i32, String, String) {
    let mut cmd = Command::new(ocikit_bin());
    cmd.args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env_remove("OCIKIT_AUTH_TOKEN")
        .env_remove("OCIKIT_PROFILE")
        .env_remove("OCIKIT_SOURCE_REGION")
        .env_remove("OCIKIT_SOURCE_COMPARTMENT")
        .env_remove("OCIKIT_SOURCE_VAULT")
        .env_remove("OCIKIT_TARGET_REGION")
        .env_remove("OCIKIT_TARGET_COMPARTMENT")
        .env_remove("OCIKIT_TARGET_VAULT")
        .env_remove("OCIKIT_TARGET_KEY")
        .env_remove("OCIKIT_COMPARTMENT")
        .env_remove("OCIKIT_MODEL")
        .env_remove("OCIKIT_AGENT_ENDPOINT");
    for (key, value) in envs {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("failed to execute ocikit");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

fn run(args: &[&str]) -> (i32, String, String) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    run_in(dir.path(), args, &[])
}

const FULL_PROFILE: &str = r#"[source]
region = "test-src-1"
compartment = "ocid1.compartment.oc1..src"
vault = "ocid1.vault.oc1.src.v1"

[target]
region = "test-tgt-1"
compartment = "ocid1.compartment.oc1..tgt"
vault = "ocid1.vault.oc1.tgt.v1"
key = "ocid1.key.oc1.tgt.master"
"#;

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "ocikit --version should exit 0");
    assert!(
        stdout.contains("ocikit"),
        "version output should contain 'ocikit': {stdout}"
    );
}

#[test]
fn test_help_lists_commands() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0, "ocikit --help should exit 0");
    assert!(stdout.contains("backup"), "help should list 'backup'");
    assert!(stdout.contains("chat"), "help should list 'chat'");
    assert!(stdout.contains("agent"), "help should list 'agent'");
}

#[test]
fn test_subcommand_help() {
    for sub in [
        vec!["backup", "--help"],
        vec!["backup", "keys", "--help"],
        vec!["backup", "secrets", "--help"],
        vec!["chat", "--help"],
        vec!["agent", "--help"],
    ] {
        let (code, stdout, _) = run(&sub);
        assert_eq!(code, 0, "{sub:?} should exit 0");
        assert!(!stdout.is_empty(), "{sub:?} should produce output");
    }
}

// ── Configuration resolution ─────────────────────────────────────────

#[test]
fn test_backup_keys_without_config_fails() {
    let (code, _, stderr) = run(&["backup", "keys"]);
    assert_ne!(code, 0, "backup keys with no config should fail");
    assert!(
        stderr.contains("missing --source-region"),
        "should report the first missing option: {stderr}"
    );
}

#[test]
fn test_backup_keys_missing_profile_file_fails() {
    let (code, _, stderr) = run(&["backup", "keys", "--profile", "/nonexistent/ocikit.toml"]);
    assert_ne!(code, 0, "missing profile file should fail");
    assert!(
        stderr.contains("failed to read"),
        "should report the unreadable profile: {stderr}"
    );
}

#[test]
fn test_profile_in_cwd_is_auto_loaded() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("ocikit.toml"), FULL_PROFILE).expect("write failed");

    // Vault coordinates resolve from the profile, so the next failure is
    // the missing session token.
    let (code, _, stderr) = run_in(dir.path(), &["backup", "keys"], &[]);
    assert_ne!(code, 0);
    assert!(
        stderr.contains("not authenticated"),
        "should fail on authentication, not configuration: {stderr}"
    );
}

#[test]
fn test_backup_secrets_requires_target_key() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let profile_without_key = FULL_PROFILE.replace("key = \"ocid1.key.oc1.tgt.master\"\n", "");
    fs::write(dir.path().join("ocikit.toml"), profile_without_key).expect("write failed");

    let (code, _, stderr) = run_in(dir.path(), &["backup", "secrets"], &[]);
    assert_ne!(code, 0, "backup secrets without a target key should fail");
    assert!(
        stderr.contains("missing --target-key"),
        "should report the missing target key: {stderr}"
    );
}

#[test]
fn test_backup_keys_fails_fatally_on_unresolvable_vault() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("ocikit.toml"), FULL_PROFILE).expect("write failed");

    let (code, _, stderr) = run_in(
        dir.path(),
        &["backup", "keys"],
        &[("OCIKIT_AUTH_TOKEN", "test-token")],
    );
    assert_ne!(code, 0, "unresolvable vault endpoint should be fatal");
    assert!(
        stderr.contains("failed to resolve vault"),
        "should report endpoint resolution failure: {stderr}"
    );
}

// ── Chat argument validation ─────────────────────────────────────────

#[test]
fn test_chat_requires_compartment_and_model() {
    let (code, _, stderr) = run(&["chat"]);
    assert_ne!(code, 0, "chat without required args should fail");
    assert!(
        stderr.contains("required"),
        "should report missing required arguments: {stderr}"
    );
}

#[test]
fn test_agent_requires_endpoint() {
    let (code, _, stderr) = run(&["agent"]);
    assert_ne!(code, 0, "agent without an endpoint should fail");
    assert!(
        stderr.contains("required"),
        "should report missing required arguments: {stderr}"
    );
}
