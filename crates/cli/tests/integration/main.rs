//! CLI integration tests.
//!
//! These run full lifecycle commands with stand-in tool binaries (`true`,
//! `false`, or small shell scripts) in place of helm and terraform.

mod common;

mod config_tests;
#[cfg(unix)]
mod lifecycle_tests;
