//! Deployment of release payloads.
//!
//! A remote path is synchronized with rsync in a single run, so re-running after an
//! interruption only re-sends what changed. A network-boot server gets one TFTP upload
//! per file, in payload order.

pub mod transfer;
mod types;

pub use types::*;

use tracing::info;

/// Ship `payload` to `destination`.
pub fn deploy(payload: &Payload, destination: &DeploymentTarget, tools: &TransferTools) -> Result<DeploymentResult, DeployError> {
  let files = payload.files()?;
  let bytes = files
    .iter()
    .map(|f| std::fs::metadata(f).map(|m| m.len()).unwrap_or(0))
    .sum();

  info!(destination = %destination, payload = payload.kind(), files = files.len(), "deploying");

  match destination {
    DeploymentTarget::RemotePath { path } => transfer::rsync(&tools.rsync, &files, destination, path)?,
    DeploymentTarget::Netboot { host, port, dir } => {
      let url = DeploymentTarget::tftp_url(host, *port, dir);
      transfer::tftp_upload(&tools.tftp_client, &files, destination, &url)?
    }
  }

  Ok(DeploymentResult {
    destination: destination.clone(),
    files,
    bytes,
  })
}
