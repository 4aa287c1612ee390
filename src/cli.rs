//! CLI parsing, kept deliberately thin: richer terminal rendering and
//! front-end ergonomics are out of scope (§1), so this module only
//! defines the argument shape described in §6 and leaves all behavior to
//! `src/bin/main.rs` and the core modules.
//!
//! Grounded on the teacher's `cli.rs` `Cli`/`Commands` derive shape and its
//! `LogLevelArg` wrapper for accepting either a level name or a 0-5 number.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::constants::{DEFAULT_DESCRIPTOR_NAME, DEFAULT_TAIL_LINES};

/// Accepts `all`, a service name, or a 0-based positional index into the
/// descriptor's iteration order (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    All,
    Name(String),
    Index(usize),
}

impl FromStr for Selector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Selector::All)
        } else if let Ok(n) = s.parse::<usize>() {
            Ok(Selector::Index(n))
        } else {
            Ok(Selector::Name(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevelArg(pub LevelFilter);

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            let level = match n {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            };
            return Ok(LogLevelArg(level));
        }
        LevelFilter::from_str(s)
            .map(LogLevelArg)
            .map_err(|_| format!("invalid log level: {s}"))
    }
}

#[derive(Debug, Parser)]
#[command(name = "pmo", version, author, about = "A lightweight process supervisor for local development services.")]
pub struct Cli {
    /// Descriptor path, default `pmo.yml` in the current directory.
    #[arg(short = 'f', long = "file", global = true, default_value = DEFAULT_DESCRIPTOR_NAME)]
    pub file: PathBuf,

    #[arg(long = "log-level", global = true, default_value = "info")]
    pub log_level: LogLevelArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start one service, all services, or a service by numeric id.
    Start { selector: Selector },
    /// Stop one service, all services, or a service by numeric id.
    Stop { selector: Selector },
    /// Stop then start.
    Restart { selector: Selector },
    /// Follow stdout/stderr for a service, all services, or a numeric id.
    Log {
        selector: Selector,
        #[arg(short = 'n', long = "lines", default_value_t = DEFAULT_TAIL_LINES)]
        lines: usize,
    },
    /// Truncate (running) or delete (stopped) a service's log files.
    Flush { selector: Selector },
    /// Print the resolved spec for a selector without spawning anything.
    DryRun { selector: Selector },
    /// List status for all services.
    Ls,
    /// Alias for `ls`.
    Ps,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
