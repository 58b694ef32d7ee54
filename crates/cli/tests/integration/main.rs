//! End-to-end tests driving the `fltrel` binary against a fake workspace.

#![cfg(unix)]

mod common;
mod release_tests;
