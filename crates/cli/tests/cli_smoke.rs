//! CLI smoke tests for fltrel.
//!
//! These tests verify that commands parse, fail cleanly without a toolchain, and return
//! appropriate exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

fn fltrel_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("fltrel");
  cmd.env_remove("FLTREL_WORKSPACE").env_remove("FLTREL_CONFIG");
  cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  fltrel_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  fltrel_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("fltrel"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["build-targets", "package", "package-and-deploy", "deploy", "verify", "toolchain", "inspect"] {
    fltrel_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn deploy_requires_destination() {
  fltrel_cmd()
    .arg("package-and-deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--destination"));
}

#[test]
fn archive_and_raw_conflict() {
  fltrel_cmd()
    .args(["package-and-deploy", "--destination", "obc:/x", "--archive", "--raw"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot be used with"));
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
#[serial]
fn missing_toolchain_is_reported() {
  let temp = TempDir::new().unwrap();

  fltrel_cmd()
    .arg("--workspace")
    .arg(temp.path())
    .arg("toolchain")
    .assert()
    .failure()
    .stderr(predicate::str::contains("configuration stage failed"))
    .stderr(predicate::str::contains("arm-linux-gcc"));
}

#[test]
#[serial]
fn missing_workspace_is_reported() {
  let temp = TempDir::new().unwrap();

  fltrel_cmd()
    .arg("--workspace")
    .arg(temp.path().join("nope"))
    .arg("build-targets")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to locate workspace"));
}

#[test]
#[serial]
fn malformed_config_is_reported() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("fltrel.toml"), "reserved_size = \"big\"\n").unwrap();

  fltrel_cmd()
    .arg("--workspace")
    .arg(temp.path())
    .arg("build-targets")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
#[serial]
fn config_from_environment_is_used() {
  let temp = TempDir::new().unwrap();
  let config = temp.path().join("custom.toml");
  std::fs::write(&config, "triple = \"arm\"\n").unwrap();

  fltrel_cmd()
    .env("FLTREL_WORKSPACE", temp.path())
    .env("FLTREL_CONFIG", &config)
    .arg("toolchain")
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid target triple 'arm'"));
}

#[test]
#[serial]
fn invalid_destination_is_reported() {
  let temp = TempDir::new().unwrap();

  fltrel_cmd()
    .arg("--workspace")
    .arg(temp.path())
    .args(["package-and-deploy", "--destination", "http://obc/upgrade"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("only tftp:// URLs are supported"));
}

// =============================================================================
// verify
// =============================================================================

#[test]
#[serial]
fn verify_nonexistent_archive_fails() {
  let temp = TempDir::new().unwrap();

  fltrel_cmd()
    .arg("--workspace")
    .arg(temp.path())
    .arg("verify")
    .arg(temp.path().join("update.tar.gz"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("update.tar.gz"));
}

#[test]
#[serial]
fn deploy_without_a_packaged_archive_fails() {
  let temp = TempDir::new().unwrap();

  fltrel_cmd()
    .arg("--workspace")
    .arg(temp.path())
    .args(["deploy", "--destination", "obc:/home/system/upgrade"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Cannot deploy"))
    .stderr(predicate::str::contains("update.tar.gz"));
}
