use std::fs;

use predicates::prelude::*;
use serial_test::serial;

use crate::common::{SERVICES, TestEnv};

// =============================================================================
// build-targets
// =============================================================================

#[test]
#[serial]
fn build_targets_builds_and_stamps_every_service() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("build-targets")
    .assert()
    .success()
    .stdout(predicate::str::contains("Built 4 target(s) for armv5te-unknown-linux-uclibceabi"));

  assert_eq!(env.build_order(), SERVICES);
  for name in SERVICES {
    assert_eq!(env.stack_size(&env.artifact(name)), 0x10000, "{} not stamped", name);
  }
}

#[test]
#[serial]
fn target_lists_accept_commas_and_spaces() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["build-targets", "shell-service,file-service", "telemetry-service"])
    .assert()
    .success();

  assert_eq!(env.build_order(), vec!["shell-service", "file-service", "telemetry-service"]);
  assert!(!env.artifact("scheduler-service").exists());
}

#[test]
#[serial]
fn failing_target_stops_the_run() {
  let env = TestEnv::new();

  env
    .cmd()
    .env("FAIL_PACKAGE", "shell-service")
    .arg("build-targets")
    .assert()
    .failure()
    .stderr(predicate::str::contains("build stage failed"))
    .stderr(predicate::str::contains("shell-service: build failed with exit code 101"));

  assert_eq!(env.build_order(), vec!["file-service", "scheduler-service", "shell-service"]);
  assert!(env.artifact("file-service").is_file());
  assert!(env.artifact("scheduler-service").is_file());
  assert!(!env.artifact("telemetry-service").exists());
}

#[test]
#[serial]
fn unknown_target_fails_before_building() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["build-targets", "radio-service"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown build target 'radio-service'"));

  assert!(env.build_order().is_empty());
}

#[test]
#[serial]
fn debug_mode_uses_debug_profile() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["build-targets", "--mode", "debug", "file-service"])
    .assert()
    .success();

  let debug = env
    .root()
    .join("target/armv5te-unknown-linux-uclibceabi/debug/file-service");
  assert_eq!(env.stack_size(&debug), 0x10000);
}

#[test]
#[serial]
fn json_output_lists_stamped_artifacts() {
  let env = TestEnv::new();

  let output = env
    .cmd()
    .args(["--output", "json", "build-targets", "file-service"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["triple"], "armv5te-unknown-linux-uclibceabi");
  assert_eq!(json["artifacts"][0]["target"], "file-service");
  assert_eq!(json["artifacts"][0]["stamped"], 0x10000);
  assert!(json.get("archive").is_none());
}

// =============================================================================
// package / verify
// =============================================================================

#[test]
#[serial]
fn package_produces_a_verifiable_archive() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("package")
    .assert()
    .success()
    .stdout(predicate::str::contains("Files: 4"))
    .stdout(predicate::str::contains("usr/sbin/telemetry-service"));

  assert!(env.archive().is_file());
  let leftovers: Vec<_> = fs::read_dir(env.root().join("release")).unwrap().collect();
  assert_eq!(leftovers.len(), 1);

  env
    .cmd()
    .arg("verify")
    .arg(env.archive())
    .assert()
    .success()
    .stdout(predicate::str::contains("matches its manifest"));
}

#[test]
#[serial]
fn packaging_is_reproducible() {
  let env = TestEnv::new();

  env.cmd().arg("package").assert().success();
  let first = fs::read(env.archive()).unwrap();

  env.cmd().arg("package").assert().success();
  let second = fs::read(env.archive()).unwrap();

  assert_eq!(first, second);
}

#[test]
#[serial]
fn verify_rejects_a_non_archive() {
  let env = TestEnv::new();
  let bogus = env.root().join("bogus.tar.gz");
  fs::write(&bogus, b"not gzip").unwrap();

  env.cmd().arg("verify").arg(&bogus).assert().failure();
}

// =============================================================================
// package-and-deploy
// =============================================================================

#[test]
#[serial]
fn deploys_archive_with_rsync() {
  let env = TestEnv::new();
  let dest = env.root().join("obc/upgrade");

  env
    .cmd()
    .args(["package-and-deploy", "--destination"])
    .arg(&dest)
    .assert()
    .success()
    .stdout(predicate::str::contains("Deployed 1 file(s)"));

  assert_eq!(fs::read(dest.join("update.tar.gz")).unwrap(), fs::read(env.archive()).unwrap());
}

#[test]
#[serial]
fn raw_deploy_to_tftp_uploads_each_binary() {
  let env = TestEnv::new();

  env
    .cmd()
    .args([
      "package-and-deploy",
      "--raw",
      "--destination",
      "tftp://10.0.0.2/boot",
      "file-service,shell-service",
    ])
    .assert()
    .success();

  let log = env.curl_log();
  assert_eq!(log.len(), 2);
  assert!(log[0].ends_with("/file-service tftp://10.0.0.2:69/boot/"));
  assert!(log[1].ends_with("/shell-service tftp://10.0.0.2:69/boot/"));
  assert!(!env.archive().exists());
}

#[test]
#[serial]
fn unreachable_destination_keeps_the_archive() {
  let env = TestEnv::new();

  env
    .cmd()
    .env("RSYNC_EXIT", "255")
    .args(["package-and-deploy", "--destination", "obc:/home/system/upgrade"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("deploy stage failed"))
    .stderr(predicate::str::contains("destination unreachable"));

  assert!(env.archive().is_file());
}

#[test]
#[serial]
fn retrying_a_failed_deploy_reuses_the_archive() {
  let env = TestEnv::new();
  let dest = env.root().join("obc/upgrade");

  env
    .cmd()
    .env("RSYNC_EXIT", "23")
    .args(["package-and-deploy", "--destination"])
    .arg(&dest)
    .assert()
    .failure()
    .stderr(predicate::str::contains("partial transfer"));

  let builds = env.build_order().len();
  let packaged = fs::read(env.archive()).unwrap();
  assert_eq!(builds, SERVICES.len());

  env
    .cmd()
    .args(["deploy", "--destination"])
    .arg(&dest)
    .assert()
    .success()
    .stdout(predicate::str::contains("Deployed 1 file(s)"));

  assert_eq!(env.build_order().len(), builds, "retry ran cargo again");
  assert_eq!(fs::read(env.archive()).unwrap(), packaged);
  assert_eq!(fs::read(dest.join("update.tar.gz")).unwrap(), packaged);
}

#[test]
#[serial]
fn deploy_refuses_an_archive_that_fails_verification() {
  let env = TestEnv::new();
  let bogus = env.root().join("bogus.tar.gz");
  fs::write(&bogus, b"not gzip").unwrap();
  let dest = env.root().join("obc/upgrade");

  env
    .cmd()
    .args(["deploy", "--destination"])
    .arg(&dest)
    .arg(&bogus)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Cannot deploy"));

  assert!(!dest.exists());
  assert!(env.build_order().is_empty());
}

// =============================================================================
// toolchain
// =============================================================================

#[test]
#[serial]
fn toolchain_shows_resolved_paths_and_env() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("toolchain")
    .assert()
    .success()
    .stdout(predicate::str::contains("toolchains/iobc/usr/bin/arm-linux-gcc"))
    .stdout(predicate::str::contains("CARGO_TARGET_ARMV5TE_UNKNOWN_LINUX_UCLIBCEABI_LINKER"))
    .stdout(predicate::str::contains("XARGO_RUST_SRC"));
}

// =============================================================================
// inspect
// =============================================================================

#[test]
#[serial]
fn inspect_reports_stamp_state() {
  let env = TestEnv::new();
  env.cmd().args(["build-targets", "file-service"]).assert().success();

  env
    .cmd()
    .arg("inspect")
    .arg(env.artifact("file-service"))
    .assert()
    .success()
    .stdout(predicate::str::contains("Stack size: 0x10000"))
    .stdout(predicate::str::contains("Revision: 4"));

  let raw = env.root().join("raw-service");
  let mut image = b"bFLT\0\0\0\x04".to_vec();
  image.resize(64, 0);
  fs::write(&raw, image).unwrap();

  env
    .cmd()
    .arg("inspect")
    .arg(&raw)
    .assert()
    .success()
    .stderr(predicate::str::contains("is not stamped with 0x10000"));
}

#[test]
#[serial]
fn inspect_rejects_non_flt_files() {
  let env = TestEnv::new();
  let elf = env.root().join("elf");
  fs::write(&elf, b"\x7fELF").unwrap();

  env
    .cmd()
    .arg("inspect")
    .arg(&elf)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read FLT header"));
}
