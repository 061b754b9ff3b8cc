//! chartmart-lib: Core types and logic for chartmart
//!
//! This crate orchestrates Helm charts and Terraform modules that depend on
//! each other:
//! - `installation`: installations and their lifecycle state machine
//! - `execute`: dependency graph, wave planning, scope resolution, and the orchestrator
//! - `manifest`: loading `workspace.yaml`
//! - `store`: persisted run state between commands
//! - `config`: CLI settings

pub mod config;
pub mod consts;
pub mod execute;
pub mod installation;
pub mod manifest;
pub mod platform;
pub mod store;
pub mod util;
