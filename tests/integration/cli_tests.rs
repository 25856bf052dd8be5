//! Integration tests for the CLI binary.
//!
//! Drives the `dauth` binary against ledgers in temporary directories.
//!
//! This test is registered as a [[test]] in the delegated-authority-cli
//! crate so that CARGO_BIN_EXE_dauth is available.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::json;

/// Get a Command pointing to the `dauth` binary.
fn dauth_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dauth"));
    cmd.env_remove("DAUTH_HOME");
    cmd
}

/// Run `dauth --state <state> <args>` and return its output.
fn dauth(state: &Path, args: &[&str]) -> Output {
    dauth_binary()
        .arg("--state")
        .arg(state)
        .args(args)
        .output()
        .expect("failed to execute dauth")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn address_of(state: &Path, name: &str) -> String {
    let output = dauth(state, &["address", name]);
    assert_success(&output, "dauth address");
    stdout(&output).trim().to_string()
}

#[test]
fn cli_responds_to_help() {
    let output = dauth_binary()
        .arg("--help")
        .output()
        .expect("failed to execute dauth --help");

    assert_success(&output, "dauth --help");
    let out = stdout(&output);
    assert!(
        out.contains("Usage") && out.contains("submit"),
        "dauth --help output should list commands, got: {out}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = dauth_binary()
        .arg("--version")
        .output()
        .expect("failed to execute dauth --version");

    assert_success(&output, "dauth --version");
    let out = stdout(&output);
    assert!(
        out.contains("0.1") || out.contains("dauth"),
        "dauth --version should contain version info, got: {out}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = dauth_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute dauth");
    assert!(!output.status.success());
}

#[test]
fn cli_commands_fail_without_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    let output = dauth(&state, &["clock", "show"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("dauth init"));
}

#[test]
fn cli_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");

    assert_success(&dauth(&state, &["init"]), "first init");
    assert!(state.exists());
    assert!(!dauth(&state, &["init"]).status.success());
    assert_success(&dauth(&state, &["init", "--force"]), "forced init");
}

#[test]
fn cli_uses_dauth_home() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_dauth"))
        .env("DAUTH_HOME", dir.path())
        .arg("init")
        .output()
        .expect("failed to execute dauth");
    assert_success(&output, "init under DAUTH_HOME");
    assert!(dir.path().join("ledger.json").exists());
}

#[test]
fn cli_addresses_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    let a1 = address_of(&state, "alice");
    let a2 = address_of(&state, "alice");
    let b = address_of(&state, "bob");
    assert_eq!(a1, a2);
    assert_ne!(a1, b);
}

#[test]
fn cli_resubmitted_file_is_signed_afresh() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    assert_success(&dauth(&state, &["init"]), "init");
    let alice = address_of(&state, "alice");
    let bob = address_of(&state, "bob");
    assert_success(
        &dauth(&state, &["fund", "alice", "--amount", "100"]),
        "fund",
    );

    let batch = dir.path().join("transfer.json");
    std::fs::write(
        &batch,
        serde_json::to_vec(&json!([{
            "signer": "alice",
            "operation": {
                "sender": alice,
                "body": { "transfer": { "receiver": bob, "asset": 0, "amount": 10 } }
            }
        }]))
        .unwrap(),
    )
    .unwrap();
    for _ in 0..2 {
        assert_success(&dauth(&state, &["submit", batch.to_str().unwrap()]), "submit");
    }

    let output = dauth(&state, &["show", "account", "alice"]);
    assert_success(&output, "show account");
    let out = stdout(&output);
    assert!(out.contains("Nonce:     2"));
    assert!(out.contains("80"));

    let output = dauth(&state, &["receipts", "list"]);
    let out = stdout(&output);
    assert_eq!(out.lines().filter(|l| l.starts_with("abatch_")).count(), 2);
}

#[test]
fn cli_fund_submit_and_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    assert_success(&dauth(&state, &["init"]), "init");

    let alice = address_of(&state, "alice");
    let bob = address_of(&state, "bob");
    assert_success(
        &dauth(&state, &["fund", "alice", "--amount", "100"]),
        "fund",
    );
    assert_success(&dauth(&state, &["clock", "advance", "5"]), "clock advance");

    // ── Transfer from alice to bob ──────────────────────────────────────
    let batch = dir.path().join("transfer.json");
    std::fs::write(
        &batch,
        serde_json::to_vec(&json!([{
            "signer": "alice",
            "operation": {
                "sender": alice,
                "body": { "transfer": { "receiver": bob, "asset": 0, "amount": 40 } }
            }
        }]))
        .unwrap(),
    )
    .unwrap();
    let output = dauth(&state, &["submit", batch.to_str().unwrap()]);
    assert_success(&output, "submit transfer");
    assert!(stdout(&output).contains("Committed abatch_"));

    let output = dauth(&state, &["show", "account", "bob"]);
    assert_success(&output, "show account");
    let out = stdout(&output);
    assert!(out.contains(&bob));
    assert!(out.contains("40"));

    // ── Deploy a controller with alice as admin ─────────────────────────
    let deploy = dir.path().join("deploy.json");
    std::fs::write(
        &deploy,
        serde_json::to_vec(&json!([{
            "signer": "alice",
            "operation": {
                "sender": alice,
                "body": { "deploy": { "program": { "controller": { "admin": alice } } } }
            }
        }]))
        .unwrap(),
    )
    .unwrap();
    let output = dauth(&state, &["submit", deploy.to_str().unwrap()]);
    assert_success(&output, "submit deploy");
    assert!(stdout(&output).contains("app#1000 (controller)"));

    let output = dauth(&state, &["show", "controller", "1000"]);
    assert_success(&output, "show controller");
    let out = stdout(&output);
    assert!(out.contains(&alice));
    assert!(out.contains("At rest:    yes"));

    let output = dauth(&state, &["show", "permissions", "1000"]);
    assert_success(&output, "show permissions");
    assert!(stdout(&output).contains("No permissions"));

    // ── Receipts are listed in commit order ─────────────────────────────
    let output = dauth(&state, &["receipts", "list"]);
    assert_success(&output, "receipts list");
    let out = stdout(&output);
    assert_eq!(out.lines().filter(|l| l.starts_with("abatch_")).count(), 2);
    assert!(out.contains("clock=5"));
}

#[test]
fn cli_rejected_batch_leaves_ledger_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("ledger.json");
    assert_success(&dauth(&state, &["init"]), "init");
    let alice = address_of(&state, "alice");
    let bob = address_of(&state, "bob");
    assert_success(&dauth(&state, &["fund", "alice", "--amount", "10"]), "fund");
    let before = std::fs::read_to_string(&state).unwrap();

    // Signed by the wrong key.
    let batch = dir.path().join("bad.json");
    std::fs::write(
        &batch,
        serde_json::to_vec(&json!([{
            "signer": "bob",
            "operation": {
                "sender": alice,
                "body": { "transfer": { "receiver": bob, "asset": 0, "amount": 10 } }
            }
        }]))
        .unwrap(),
    )
    .unwrap();
    let output = dauth(&state, &["submit", batch.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("batch rejected"));

    let after = std::fs::read_to_string(&state).unwrap();
    assert_eq!(before, after);
}
