//! fltrel-lib: build-and-release pipeline for the FLT service fleet
//!
//! Stages, in pipeline order:
//! - `toolchain`: resolves and validates the cross toolchain under a workspace root
//! - `build`: cross-compiles services one at a time, failing fast
//! - `stamp`: writes the stack reservation into each binary's FLT header
//! - `package`: stages stamped binaries, writes a checksum manifest and a reproducible archive
//! - `deploy`: ships the archive or raw binaries with rsync or TFTP
//!
//! `pipeline` composes them; `config` loads `fltrel.toml`.

pub mod build;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod package;
pub mod pipeline;
pub mod stamp;
pub mod toolchain;
pub mod util;
