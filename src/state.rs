//! State Store: the on-disk layout backing [`crate::spawn`], [`crate::stop`],
//! [`crate::status`], and [`crate::logs`].
//!
//! Paths are rooted at an explicit [`Context`] rather than a process-wide
//! singleton: the CLI constructs one `Context` per invocation and threads it
//! through the core, matching the spec's "no global mutable state"
//! direction instead of the teacher's `runtime::CONTEXT` `OnceLock`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::constants::{
    LOGS_SUBDIR, PIDS_SUBDIR, PID_FILE_EXT, RESTARTS_FILE_EXT, STATE_DIR_MODE, STDERR_LOG_SUFFIX,
    STDOUT_LOG_SUFFIX, TIME_FILE_EXT,
};
use crate::error::SupervisorError;

/// Paths and host scope threaded through every core operation for one CLI
/// invocation. Constructed once in `main`, never stored globally.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory the descriptor lives in; relative `cwd`s in service specs
    /// resolve against this.
    pub descriptor_dir: PathBuf,
    /// Data root, normally `<descriptor_dir>/.pmo`.
    pub data_root: PathBuf,
    /// Hostname used to scope state so a descriptor shared over a network
    /// filesystem does not alias PIDs across machines.
    pub host: String,
}

impl Context {
    pub fn new(descriptor_dir: impl Into<PathBuf>, data_root: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        Self {
            descriptor_dir: descriptor_dir.into(),
            data_root: data_root.into(),
            host: host.into(),
        }
    }

    /// Convenience constructor using the real hostname and `<descriptor_dir>/.pmo`.
    pub fn for_descriptor_dir(descriptor_dir: impl Into<PathBuf>) -> Self {
        let descriptor_dir = descriptor_dir.into();
        let data_root = descriptor_dir.join(crate::constants::DATA_ROOT_DIR_NAME);
        let host = current_hostname();
        Self::new(descriptor_dir, data_root, host)
    }

    fn host_root(&self) -> PathBuf {
        self.data_root.join(&self.host)
    }

    fn pids_dir(&self) -> PathBuf {
        self.host_root().join(PIDS_SUBDIR)
    }

    fn logs_dir(&self) -> PathBuf {
        self.host_root().join(LOGS_SUBDIR)
    }
}

fn current_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// The filesystem-backed State Store for one [`Context`].
pub struct StateStore {
    ctx: Context,
}

impl StateStore {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Idempotently creates the host-scoped pids/ and logs/ directories.
    pub fn ensure_layout(&self) -> io::Result<()> {
        create_dir_all_mode(&self.ctx.pids_dir(), STATE_DIR_MODE)?;
        create_dir_all_mode(&self.ctx.logs_dir(), STATE_DIR_MODE)?;
        Ok(())
    }

    pub fn pid_path(&self, name: &str) -> PathBuf {
        self.ctx.pids_dir().join(format!("{name}.{PID_FILE_EXT}"))
    }

    pub fn time_path(&self, name: &str) -> PathBuf {
        self.ctx.pids_dir().join(format!("{name}.{TIME_FILE_EXT}"))
    }

    pub fn restarts_path(&self, name: &str) -> PathBuf {
        self.ctx
            .pids_dir()
            .join(format!("{name}.{RESTARTS_FILE_EXT}"))
    }

    pub fn stdout_log_path(&self, name: &str) -> PathBuf {
        self.ctx.logs_dir().join(format!("{name}{STDOUT_LOG_SUFFIX}"))
    }

    pub fn stderr_log_path(&self, name: &str) -> PathBuf {
        self.ctx.logs_dir().join(format!("{name}{STDERR_LOG_SUFFIX}"))
    }

    /// Reads the recorded pid, if any. A present-but-unparseable pid file
    /// is state corruption (§7): it's logged as a warning and the file is
    /// auto-repaired by deletion rather than silently treated as absent.
    pub fn read_pid(&self, name: &str) -> Option<i32> {
        let raw = read_trimmed(&self.pid_path(name))?;
        match raw.parse::<i32>() {
            Ok(pid) => Some(pid),
            Err(_) => {
                let corruption = SupervisorError::StateCorruption {
                    service: name.to_string(),
                    detail: format!("pid file contains non-numeric value '{raw}'"),
                };
                warn!("{corruption}");
                let _ = self.remove_pid(name);
                None
            }
        }
    }

    pub fn read_start_time(&self, name: &str) -> Option<f64> {
        read_trimmed(&self.time_path(name)).and_then(|s| s.parse().ok())
    }

    pub fn read_restarts(&self, name: &str) -> u32 {
        read_trimmed(&self.restarts_path(name))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// Write order for a fresh start: time, then restarts (left untouched
    /// unless this is a restart), then pid last — so `pid_path` existing
    /// implies the other two already do.
    pub fn write_start_time_now(&self, name: &str) -> io::Result<()> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        write_atomic(&self.time_path(name), format!("{secs}").as_bytes())
    }

    pub fn write_restarts(&self, name: &str, count: u32) -> io::Result<()> {
        write_atomic(&self.restarts_path(name), count.to_string().as_bytes())
    }

    pub fn write_pid(&self, name: &str, pid: i32) -> io::Result<()> {
        write_atomic(&self.pid_path(name), pid.to_string().as_bytes())
    }

    pub fn remove_pid(&self, name: &str) -> io::Result<()> {
        remove_if_exists(&self.pid_path(name))
    }

    pub fn remove_start_time(&self, name: &str) -> io::Result<()> {
        remove_if_exists(&self.time_path(name))
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Write-to-temp-then-rename so readers never observe a partial file.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("state"),
        std::process::id()
    ));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(unix)]
fn create_dir_all_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if path.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
}

#[cfg(not(unix))]
fn create_dir_all_mode(path: &Path, _mode: u32) -> io::Result<()> {
    fs::create_dir_all(path)
}
