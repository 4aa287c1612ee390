//! Log Tailer: follows one or more log files concurrently and merges them
//! into a single timestamped stream, without relying on inotify.
//!
//! The teacher's `logs.rs` shells out to the system `tail -F` binary; the
//! spec asks for a portable polling baseline that "must not change
//! observable behavior" across platforms (§4.5/§9), so this tailer reads
//! and polls in-process instead, grounded on the teacher's thread-per-
//! stream shape (`spawn_log_writer`) rather than its external-process one.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::constants::TAIL_POLL_INTERVAL;
use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub service: String,
    pub kind: StreamKind,
    pub timestamp: DateTime<Utc>,
    /// Whether `timestamp` was parsed from the line itself or synthesized
    /// at read time.
    pub timestamp_is_synthetic: bool,
    pub content: String,
}

/// Reads the last `n` lines of `path`, returning fewer if the file is
/// shorter. Used to seed a tail session before following.
fn read_last_lines(path: &Path, n: usize) -> Vec<String> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };
    let reader = BufReader::new(file);
    let all: Vec<String> = reader.lines().map_while(Result::ok).collect();
    let start = all.len().saturating_sub(n);
    all[start..].to_vec()
}

fn parse_line(raw: &str) -> (DateTime<Utc>, bool, String) {
    if let Some((ts, rest)) = split_leading_timestamp(raw) {
        return (ts, false, rest);
    }
    (Utc::now(), true, raw.to_string())
}

/// Recognizes a leading ISO 8601 timestamp, or one wrapped in `[...]`,
/// separating it from the remaining content.
fn split_leading_timestamp(line: &str) -> Option<(DateTime<Utc>, String)> {
    let trimmed = line.trim_start();
    let bracketed = trimmed.starts_with('[');
    let candidate_end = if bracketed {
        trimmed.find(']')?
    } else {
        trimmed.find(' ').unwrap_or(trimmed.len())
    };

    let candidate = if bracketed {
        &trimmed[1..candidate_end]
    } else {
        &trimmed[..candidate_end]
    };

    let parsed = match DateTime::parse_from_rfc3339(candidate) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            let naive =
                chrono::NaiveDateTime::parse_from_str(candidate, "%Y-%m-%d %H:%M:%S%.f").ok()?;
            Local.from_local_datetime(&naive).single()?.with_timezone(&Utc)
        }
    };

    let rest_start = if bracketed { candidate_end + 1 } else { candidate_end };
    let rest = trimmed[rest_start..].trim_start().to_string();
    Some((parsed, rest))
}

/// Tails a single service's stdout/stderr, sending each new [`LogLine`] to
/// `sink`, seeded with its last `initial_lines` lines. Runs until
/// `running` is cleared.
pub fn follow_service(
    store: &StateStore,
    service: &str,
    initial_lines: usize,
    running: Arc<AtomicBool>,
    sink: Sender<LogLine>,
) {
    let out_path = store.stdout_log_path(service);
    let err_path = store.stderr_log_path(service);

    for line in read_last_lines(&out_path, initial_lines) {
        let (ts, synthetic, content) = parse_line(&line);
        let _ = sink.send(LogLine {
            service: service.to_string(),
            kind: StreamKind::Stdout,
            timestamp: ts,
            timestamp_is_synthetic: synthetic,
            content,
        });
    }
    for line in read_last_lines(&err_path, initial_lines) {
        let (ts, synthetic, content) = parse_line(&line);
        let _ = sink.send(LogLine {
            service: service.to_string(),
            kind: StreamKind::Stderr,
            timestamp: ts,
            timestamp_is_synthetic: synthetic,
            content,
        });
    }

    let out_handle = spawn_follow_thread(out_path, service.to_string(), StreamKind::Stdout, running.clone(), sink.clone());
    let err_handle = spawn_follow_thread(err_path, service.to_string(), StreamKind::Stderr, running, sink);

    let _ = out_handle.join();
    let _ = err_handle.join();
}

fn spawn_follow_thread(
    path: PathBuf,
    service: String,
    kind: StreamKind,
    running: Arc<AtomicBool>,
    sink: Sender<LogLine>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut pos: u64 = File::open(&path).and_then(|f| f.metadata()).map(|m| m.len()).unwrap_or(0);
        while running.load(Ordering::Relaxed) {
            if let Ok(mut file) = File::open(&path) {
                if let Ok(metadata) = file.metadata() {
                    let len = metadata.len();
                    if len < pos {
                        // Truncated by `flush`; restart from the top.
                        pos = 0;
                    }
                    if len > pos {
                        if file.seek(SeekFrom::Start(pos)).is_ok() {
                            let mut buf = String::new();
                            if file.read_to_string(&mut buf).is_ok() {
                                pos = len;
                                for line in buf.lines() {
                                    let (ts, synthetic, content) = parse_line(line);
                                    let _ = sink.send(LogLine {
                                        service: service.clone(),
                                        kind,
                                        timestamp: ts,
                                        timestamp_is_synthetic: synthetic,
                                        content,
                                    });
                                }
                            }
                        }
                    }
                }
            }
            thread::sleep(TAIL_POLL_INTERVAL);
        }
    })
}

/// Starts following every existing log pair for `services`, returning the
/// merged-by-arrival receiver and a flag the caller can clear (on SIGINT)
/// to stop all follower threads cooperatively.
pub fn follow_all(store: &StateStore, services: &[String], initial_lines: usize) -> (Receiver<LogLine>, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::channel();
    let running = Arc::new(AtomicBool::new(true));

    for service in services {
        let store_ctx = store.context().clone();
        let service = service.clone();
        let running = running.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            let store = StateStore::new(store_ctx);
            follow_service(&store, &service, initial_lines, running, tx);
        });
    }

    (rx, running)
}

/// Truncates a running service's log files (preserving open descriptors
/// held by the child) or deletes them if the service is stopped (§4.5).
pub fn flush(store: &StateStore, service: &str, is_running: bool) -> std::io::Result<()> {
    let out = store.stdout_log_path(service);
    let err = store.stderr_log_path(service);
    if is_running {
        truncate_if_exists(&out)?;
        truncate_if_exists(&err)?;
    } else {
        remove_if_exists(&out)?;
        remove_if_exists(&err)?;
    }
    Ok(())
}

fn truncate_if_exists(path: &Path) -> std::io::Result<()> {
    match File::options().write(true).truncate(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
