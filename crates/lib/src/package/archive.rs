//! Deterministic tar.gz writer.
//!
//! Entries are appended in sorted path order with every header field that could vary
//! between machines or runs pinned: owner uid/gid 0 named `root`, mtime
//! [`SOURCE_DATE_EPOCH`], and mode 0755 or 0644. The gzip header carries no file name
//! and a zero mtime. Identical trees therefore always produce identical bytes.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};
use walkdir::{DirEntry, WalkDir};

use crate::consts::{ARCHIVE_OWNER, SOURCE_DATE_EPOCH};
use crate::util::fs::is_executable;
use crate::util::hash::relative_key;

use super::types::PackagingError;

fn normalized_header(entry_type: EntryType, size: u64, mode: u32) -> io::Result<Header> {
  let mut header = Header::new_gnu();
  header.set_entry_type(entry_type);
  header.set_size(size);
  header.set_mode(mode);
  header.set_uid(0);
  header.set_gid(0);
  header.set_username(ARCHIVE_OWNER)?;
  header.set_groupname(ARCHIVE_OWNER)?;
  header.set_mtime(SOURCE_DATE_EPOCH);
  Ok(header)
}

/// Every file and directory under `root`, keyed and sorted by its `/`-separated path.
fn sorted_entries(root: &Path) -> Result<Vec<(String, DirEntry)>, PackagingError> {
  let mut entries = Vec::new();
  for entry in WalkDir::new(root).min_depth(1) {
    let entry = entry.map_err(|e| PackagingError::Io {
      path: root.to_path_buf(),
      source: e.into(),
    })?;
    let name = relative_key(root, entry.path())?;
    entries.push((name, entry));
  }
  entries.sort_by(|a, b| a.0.cmp(&b.0));
  Ok(entries)
}

/// Write the tree under `root` as a gzip'd tar into `out`.
pub fn write_tree<W: Write>(root: &Path, out: W) -> Result<W, PackagingError> {
  let gz = GzBuilder::new().mtime(0).write(out, Compression::best());
  let mut builder = Builder::new(gz);

  for (name, entry) in sorted_entries(root)? {
    let path = entry.path();

    if entry.file_type().is_dir() {
      let mut header = normalized_header(EntryType::Directory, 0, 0o755).map_err(|e| PackagingError::io(path, e))?;
      builder
        .append_data(&mut header, format!("{}/", name), io::empty())
        .map_err(|e| PackagingError::io(path, e))?;
    } else if entry.file_type().is_file() {
      let meta = fs::metadata(path).map_err(|e| PackagingError::io(path, e))?;
      let mode = if is_executable(&meta) { 0o755 } else { 0o644 };
      let mut header =
        normalized_header(EntryType::Regular, meta.len(), mode).map_err(|e| PackagingError::io(path, e))?;
      let file = File::open(path).map_err(|e| PackagingError::io(path, e))?;
      builder
        .append_data(&mut header, &name, file)
        .map_err(|e| PackagingError::io(path, e))?;
    }
  }

  let gz = builder.into_inner().map_err(|e| PackagingError::io(root, e))?;
  gz.finish().map_err(|e| PackagingError::io(root, e))
}
