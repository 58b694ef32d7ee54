//! Implementation of the `fltrel inspect` command.
//!
//! Dumps the FLT header of one or more binaries and whether each already carries the
//! configured stack reservation.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use fltrel_lib::stamp::flt::FltHeader;

use super::Context;
use crate::output::{print_json, print_stat, print_success, print_warning};

#[derive(Serialize)]
struct Inspection {
  path: PathBuf,
  header: FltHeader,
  flags: Vec<&'static str>,
  stamped: bool,
}

pub fn cmd_inspect(ctx: &Context, binaries: &[PathBuf]) -> Result<()> {
  let reserved_size = ctx.config.reserved_size;

  let mut inspections = Vec::with_capacity(binaries.len());
  for path in binaries {
    let header = FltHeader::read_from(path).with_context(|| format!("Failed to read FLT header of {}", path.display()))?;
    inspections.push(Inspection {
      path: path.clone(),
      flags: header.flag_names(),
      stamped: header.stack_size == reserved_size,
      header,
    });
  }

  if ctx.output.is_json() {
    return print_json(&inspections);
  }

  for (index, inspection) in inspections.iter().enumerate() {
    if index > 0 {
      println!();
    }
    let header = &inspection.header;
    if inspection.stamped {
      print_success(&format!("{}", inspection.path.display()));
    } else {
      print_warning(&format!(
        "{} is not stamped with {:#x}",
        inspection.path.display(),
        reserved_size
      ));
    }
    print_stat("Revision", &header.rev.to_string());
    print_stat("Entry", &format!("{:#x}", header.entry));
    print_stat(
      "Data",
      &format!("{:#x}..{:#x}", header.data_start, header.data_end),
    );
    print_stat("BSS end", &format!("{:#x}", header.bss_end));
    print_stat("Stack size", &format!("{:#x}", header.stack_size));
    print_stat(
      "Relocations",
      &format!("{} at {:#x}", header.reloc_count, header.reloc_start),
    );
    print_stat("Flags", &inspection.flags.join(", "));
  }

  Ok(())
}
