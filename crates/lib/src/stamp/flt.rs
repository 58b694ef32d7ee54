//! FLT (flat binary) header parsing.
//!
//! The header is 64 bytes, all fields big-endian:
//!
//! ```text
//! 0   magic "bFLT"     24  stack_size
//! 4   rev              28  reloc_start
//! 8   entry            32  reloc_count
//! 12  data_start       36  flags
//! 16  data_end         40  build_date
//! 20  bss_end          44  filler[5]
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

pub const FLT_MAGIC: &[u8; 4] = b"bFLT";
pub const HEADER_LEN: usize = 64;
pub const STACK_SIZE_OFFSET: usize = 24;
pub const SUPPORTED_REVISIONS: [u32; 2] = [2, 4];

pub const FLAG_RAM: u32 = 0x01;
pub const FLAG_GOTPIC: u32 = 0x02;
pub const FLAG_GZIP: u32 = 0x04;
pub const FLAG_GZDATA: u32 = 0x08;
pub const FLAG_KTRACE: u32 = 0x10;

#[derive(Debug, Error)]
pub enum FltError {
  #[error("file too short for an FLT header ({0} bytes)")]
  TooShort(usize),

  #[error("bad magic {0:02x?}, not an FLT binary")]
  BadMagic([u8; 4]),

  #[error("unsupported FLT revision {0}")]
  UnsupportedRevision(u32),

  #[error(transparent)]
  Io(#[from] io::Error),
}

/// Decoded FLT header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FltHeader {
  pub rev: u32,
  pub entry: u32,
  pub data_start: u32,
  pub data_end: u32,
  pub bss_end: u32,
  /// Stack/heap reservation the loader allocates at process start.
  pub stack_size: u32,
  pub reloc_start: u32,
  pub reloc_count: u32,
  pub flags: u32,
  pub build_date: u32,
}

impl FltHeader {
  pub fn parse(bytes: &[u8]) -> Result<Self, FltError> {
    if bytes.len() < HEADER_LEN {
      return Err(FltError::TooShort(bytes.len()));
    }

    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if &magic != FLT_MAGIC {
      return Err(FltError::BadMagic(magic));
    }

    let field = |offset: usize| u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]);

    let rev = field(4);
    if !SUPPORTED_REVISIONS.contains(&rev) {
      return Err(FltError::UnsupportedRevision(rev));
    }

    Ok(Self {
      rev,
      entry: field(8),
      data_start: field(12),
      data_end: field(16),
      bss_end: field(20),
      stack_size: field(STACK_SIZE_OFFSET),
      reloc_start: field(28),
      reloc_count: field(32),
      flags: field(36),
      build_date: field(40),
    })
  }

  /// Read and parse the header at the start of `path`.
  pub fn read_from(path: &Path) -> Result<Self, FltError> {
    let mut file = File::open(path)?;
    let mut buf = Vec::with_capacity(HEADER_LEN);
    file.by_ref().take(HEADER_LEN as u64).read_to_end(&mut buf)?;
    Self::parse(&buf)
  }

  /// Names of the set flag bits.
  pub fn flag_names(&self) -> Vec<&'static str> {
    [
      (FLAG_RAM, "ram"),
      (FLAG_GOTPIC, "gotpic"),
      (FLAG_GZIP, "gzip"),
      (FLAG_GZDATA, "gzdata"),
      (FLAG_KTRACE, "ktrace"),
    ]
    .iter()
    .filter(|(bit, _)| self.flags & bit != 0)
    .map(|(_, name)| *name)
    .collect()
  }
}
