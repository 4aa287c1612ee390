//! A lightweight process supervisor for local development services.
//!
//! The core resolves a YAML descriptor into concrete services, spawns
//! them as detached process-group leaders, tracks per-service on-disk
//! state across supervisor restarts, and can gracefully stop, probe the
//! status of, or tail the logs of those services. There is no persistent
//! supervising daemon: each CLI invocation is short-lived and delegates
//! actual supervision to the OS once children are detached.

#![warn(unused_crate_dependencies)]
#[cfg(test)]
use assert_cmd as _;
use ctrlc as _;
#[cfg(test)]
use predicates as _;
#[cfg(test)]
use tempfile as _;
use tracing_subscriber as _;

/// CLI argument parsing.
pub mod cli;

/// Config Resolver: descriptor + dotenv loading and normalization.
pub mod config;

/// Shared constants and file-naming conventions.
pub mod constants;

/// Error taxonomy and informational outcomes.
pub mod error;

/// GPU adapter (thin wrapper around `nvidia-smi`).
pub mod gpu;

/// Log Tailer.
pub mod logs;

/// Process Runner.
pub mod spawn;

/// State Store and explicit per-invocation context.
pub mod state;

/// Status Probe.
pub mod status;

/// Stop Controller.
pub mod stop;
