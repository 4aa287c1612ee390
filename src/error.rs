//! Error taxonomy for the supervisor core.
//!
//! Mirrors the teacher's split between "core operation" errors and
//! "on-disk state" errors, expressed as a `thiserror`-derived enum so `?`
//! composes across the Config Resolver, Process Runner, and Stop
//! Controller. `AlreadyRunning`/`NotRunning`/`UnkillableDescendant` are
//! deliberately not part of this enum: the spec treats them as
//! informational outcomes, not failures, so they live in [`crate::Outcome`]
//! instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to read descriptor {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse descriptor {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("descriptor {path} must be a YAML mapping at the top level")]
    ConfigNotAMapping { path: PathBuf },

    #[error("unknown service '{name}'")]
    UnknownService { name: String },

    #[error("failed to spawn '{service}': {reason}")]
    SpawnFailed { service: String, reason: String },

    #[error("'{service}' did not stop within {timeout_secs}s")]
    StopTimeout { service: String, timeout_secs: u64 },

    #[error("state for '{service}' is corrupt: {detail}")]
    StateCorruption { service: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Informational result of a lifecycle operation. Unlike [`SupervisorError`]
/// these are not failures: the CLI still exits 0 (or, for batch operations,
/// folds them into the partial-failure exit code 3 only when mixed with a
/// real error for another service).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started { pid: i32 },
    AlreadyRunning { pid: i32 },
    Stopped,
    NotRunning,
    StoppedWithUnkillableDescendants { pids: Vec<i32> },
    Restarted { pid: i32, restarts: u32 },
    Flushed,
}
