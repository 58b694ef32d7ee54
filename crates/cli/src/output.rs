//! Terminal output for fltrel commands.
//!
//! Command results go to stdout, either as status lines or as a single JSON document with
//! `--output json`. Warnings and errors always go to stderr so they never mix into JSON.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

/// Format of command results on stdout.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub const ARROW: &str = "→";

#[derive(Debug, Clone, Copy)]
enum Level {
  Success,
  Info,
  Warning,
  Error,
}

impl Level {
  fn symbol(self) -> &'static str {
    match self {
      Level::Success => "✓",
      Level::Info => "•",
      Level::Warning => "⚠",
      Level::Error => "✗",
    }
  }

  fn stream(self) -> Stream {
    match self {
      Level::Success | Level::Info => Stream::Stdout,
      Level::Warning | Level::Error => Stream::Stderr,
    }
  }

  fn paint(self, text: &str) -> String {
    let stream = self.stream();
    match self {
      Level::Success => text.if_supports_color(stream, |s| s.green()).to_string(),
      Level::Info => text.if_supports_color(stream, |s| s.blue()).to_string(),
      Level::Warning => text.if_supports_color(stream, |s| s.yellow()).to_string(),
      Level::Error => text.if_supports_color(stream, |s| s.red()).to_string(),
    }
  }

  fn emit(self, message: &str) {
    let symbol = self.paint(self.symbol());
    match self.stream() {
      Stream::Stdout => println!("{} {}", symbol, message),
      _ => eprintln!("{} {}", symbol, self.paint(message)),
    }
  }
}

pub fn print_success(message: &str) {
  Level::Success.emit(message);
}

pub fn print_info(message: &str) {
  Level::Info.emit(message);
}

pub fn print_warning(message: &str) {
  Level::Warning.emit(message);
}

pub fn print_error(message: &str) {
  Level::Error.emit(message);
}

/// Indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// How an archive entry differs from its manifest.
#[derive(Debug, Clone, Copy)]
pub enum Drift {
  Missing,
  Extra,
  Altered,
}

impl Drift {
  fn marker(self) -> char {
    match self {
      Drift::Missing => '-',
      Drift::Extra => '+',
      Drift::Altered => '~',
    }
  }
}

pub fn print_drift(drift: Drift, path: &str, note: &str) {
  print_warning(&format!("{} {} ({})", drift.marker(), path, note));
}

/// Leading 12 hex digits, enough to tell digests apart in a listing.
pub fn short_digest(digest: &str) -> &str {
  digest.get(..12).unwrap_or(digest)
}

pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];

  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = 0;
  while value >= 1024.0 && unit + 1 < UNITS.len() {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, UNITS[unit])
}

pub fn format_duration(duration: Duration) -> String {
  match duration.as_secs() {
    0 => format!("{}ms", duration.subsec_millis()),
    1..60 => format!("{:.2}s", duration.as_secs_f64()),
    secs => format!("{}m {}s", secs / 60, secs % 60),
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
