//! Shared utilities.
//!
//! Run identifiers and test helpers.

pub mod run_id;

#[cfg(test)]
pub mod testutil;
