//! Implementation of the `fltrel package-and-deploy` and `fltrel deploy` commands.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use serde::Serialize;

use fltrel_lib::deploy::{self, DeploymentResult, DeploymentTarget, Payload};
use fltrel_lib::package::ReleaseArchive;
use fltrel_lib::pipeline::{Flow, ReleaseRequest};

use super::package::print_archive;
use super::{BuildArgs, Context, print_artifacts};
use crate::output::{ARROW, format_bytes, format_duration, print_json, print_stat, print_success};

pub fn cmd_deploy(ctx: &Context, args: &BuildArgs, destination: &str, raw: bool, output_dir: Option<PathBuf>) -> Result<()> {
  let start = Instant::now();
  let target: DeploymentTarget = destination.parse().context("Invalid --destination")?;
  let pipeline = ctx.pipeline(args)?;

  let flow = if raw {
    Flow::DeployRaw(target)
  } else {
    Flow::DeployArchive(target)
  };
  let mut request = ReleaseRequest::new(args.target_names(), flow);
  request.output_dir = output_dir;
  let outcome = pipeline.run(&request)?;

  if ctx.output.is_json() {
    return print_json(&outcome);
  }

  print_artifacts(&outcome.artifacts);
  if let Some(archive) = &outcome.archive {
    print_archive(archive);
  }
  if let Some(deployment) = &outcome.deployment {
    print_deployment(deployment, start.elapsed());
  }

  Ok(())
}

#[derive(Serialize)]
struct Redeploy<'a> {
  archive: &'a ReleaseArchive,
  deployment: &'a DeploymentResult,
}

/// Ship an archive left behind by an earlier run, typically after a failed transfer.
///
/// The archive is checked against its manifest first. Nothing is built or packaged.
pub fn cmd_deploy_archive(ctx: &Context, archive: Option<PathBuf>, destination: &str) -> Result<()> {
  let start = Instant::now();
  let target: DeploymentTarget = destination.parse().context("Invalid --destination")?;

  let release = &ctx.config.release;
  let path = archive.unwrap_or_else(|| ctx.workspace.join(&release.output_dir).join(&release.archive_name));
  let archive = ReleaseArchive::open(&path, &release.manifest_name)
    .with_context(|| format!("Cannot deploy {}", path.display()))?;

  let deployment = deploy::deploy(&Payload::Archive(archive.clone()), &target, &ctx.config.deploy)
    .with_context(|| format!("Failed to deploy {}", path.display()))?;

  if ctx.output.is_json() {
    return print_json(&Redeploy {
      archive: &archive,
      deployment: &deployment,
    });
  }

  print_archive(&archive);
  print_deployment(&deployment, start.elapsed());
  Ok(())
}

fn print_deployment(deployment: &DeploymentResult, elapsed: Duration) {
  println!();
  print_success(&format!(
    "Deployed {} file(s) {} {} in {}",
    deployment.files.len(),
    ARROW,
    deployment.destination,
    format_duration(elapsed)
  ));
  print_stat("Sent", &format_bytes(deployment.bytes));
}
