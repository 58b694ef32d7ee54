//! Shared utilities.
//!
//! Content hashing, small filesystem helpers, and test helpers for fake external tools.

pub mod fs;
pub mod hash;

#[cfg(test)]
pub mod testutil;
