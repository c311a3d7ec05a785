#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;

const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const VAULT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// The binary with a clean environment so host variables cannot leak in.
fn sentinel() -> Command {
    let mut cmd = Command::cargo_bin("sentinel").unwrap();
    cmd.env_clear();
    cmd
}

/// A complete configuration pointing at a port nothing listens on.
fn configured() -> Command {
    let mut cmd = sentinel();
    cmd.env("RPC_URL", "http://127.0.0.1:1")
        .env("PRIVATE_KEY", KEY)
        .env("VAULT_ADDRESS", VAULT)
        .env("POLL_INTERVAL_MS", "30000")
        .env("READ_TIMEOUT_MS", "2000");
    cmd
}

// ---------------------------------------------------------------------------
// configuration
// ---------------------------------------------------------------------------

#[test]
fn missing_config_lists_every_required_key() {
    sentinel()
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("configuration validation failed"))
        .stderr(predicate::str::contains("RPC_URL: is required"))
        .stderr(predicate::str::contains("PRIVATE_KEY: is required"))
        .stderr(predicate::str::contains("VAULT_ADDRESS: is required"))
        .stderr(predicate::str::contains("POLL_INTERVAL_MS: is required"));
}

#[test]
fn bare_invocation_validates_config_before_running() {
    sentinel()
        .assert()
        .failure()
        .stderr(predicate::str::contains("RPC_URL"));
}

#[test]
fn malformed_values_are_reported_together() {
    configured()
        .env("PRIVATE_KEY", "0x1234")
        .env("POLL_INTERVAL_MS", "0")
        .arg("once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PRIVATE_KEY"))
        .stderr(predicate::str::contains("POLL_INTERVAL_MS"))
        .stderr(predicate::str::contains("RPC_URL").not());
}

#[test]
fn flags_override_environment() {
    configured()
        .args(["--poll-interval-ms", "abc", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("POLL_INTERVAL_MS"));
}

#[test]
fn unsupported_rpc_scheme_is_rejected() {
    configured()
        .env("RPC_URL", "ws://127.0.0.1:8545")
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported scheme 'ws'"));
}

// ---------------------------------------------------------------------------
// unreachable ledger
// ---------------------------------------------------------------------------

#[test]
fn check_reports_unreachable_vault_as_json() {
    configured()
        .args(["check", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"vaultError\""))
        .stdout(predicate::str::contains("\"status\": \"unverified\""))
        .stdout(predicate::str::is_match("(?i)0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap());
}

#[test]
fn once_aborts_when_vault_unreadable() {
    configured()
        .args(["once", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"aborted\""))
        .stderr(predicate::str::contains("cycle aborted"));
}

#[test]
fn private_key_never_printed() {
    let out = configured().args(["check", "--json"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let bare = KEY.trim_start_matches("0x");
    assert!(!stdout.contains(bare));
    assert!(!stderr.contains(bare));
}

#[test]
fn help_lists_subcommands() {
    sentinel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("once"))
        .stdout(predicate::str::contains("check"));
}
