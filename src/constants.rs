//! Constants and configuration values shared across the supervisor core.
//!
//! Centralizes the magic numbers and file-naming conventions used by the
//! Config Resolver, State Store, Process Runner, Stop Controller, and Log
//! Tailer so they stay consistent across modules.

use std::time::Duration;

// ============================================================================
// Descriptor and environment files
// ============================================================================

/// Default descriptor file name, looked up in the current directory unless
/// overridden with `-f`.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "pmo.yml";

/// Dotenv file name, read from the descriptor's directory.
pub const DEFAULT_ENV_FILE_NAME: &str = ".env";

/// Top-level key that is always dropped from a descriptor, with a warning,
/// to avoid a service shadowing the tool's own identity.
pub const RESERVED_SERVICE_NAME: &str = "pmo";

// ============================================================================
// State layout
// ============================================================================

/// Name of the data root directory created relative to the descriptor's
/// directory.
pub const DATA_ROOT_DIR_NAME: &str = ".pmo";

pub const PIDS_SUBDIR: &str = "pids";
pub const LOGS_SUBDIR: &str = "logs";

pub const PID_FILE_EXT: &str = "pid";
pub const TIME_FILE_EXT: &str = "time";
pub const RESTARTS_FILE_EXT: &str = "restarts";

pub const STDOUT_LOG_SUFFIX: &str = "-out.log";
pub const STDERR_LOG_SUFFIX: &str = "-error.log";

/// Mode used when creating host-scoped state directories.
pub const STATE_DIR_MODE: u32 = 0o755;

// ============================================================================
// Shell execution
// ============================================================================

pub const DEFAULT_SHELL: &str = "sh";
pub const SHELL_COMMAND_FLAG: &str = "-c";

// ============================================================================
// Stop Controller timing
// ============================================================================

/// Poll interval while waiting for a signaled process tree to exit.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default grace period between SIGTERM and SIGKILL escalation.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded final poll window after SIGKILL, before giving up and reporting
/// an unkillable descendant.
pub const FINAL_KILL_POLL_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Log Tailer
// ============================================================================

/// Default number of trailing lines shown by `log` when no `-n` is given.
pub const DEFAULT_TAIL_LINES: usize = 15;

/// Polling interval for the portable (non-inotify) follow loop.
pub const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(200);
