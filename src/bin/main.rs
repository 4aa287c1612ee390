use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use pmo::cli::{Commands, Selector, parse_args};
use pmo::config::{self, Descriptor, ServiceSpec};
use pmo::constants::DEFAULT_STOP_TIMEOUT;
use pmo::error::{Outcome, SupervisorError};
use pmo::state::{Context, StateStore};
use pmo::{logs, spawn, status, stop};

const EXIT_OK: u8 = 0;
const EXIT_IO_OR_CONFIG: u8 = 1;
const EXIT_UNKNOWN_SERVICE: u8 = 2;
const EXIT_PARTIAL_FAILURE: u8 = 3;

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(args.log_level.0);

    let descriptor = match config::load(&args.file) {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "failed to load descriptor");
            return ExitCode::from(EXIT_IO_OR_CONFIG);
        }
    };

    let descriptor_dir = args
        .file
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let ctx = Context::for_descriptor_dir(descriptor_dir);
    let store = StateStore::new(ctx);
    if let Err(e) = store.ensure_layout() {
        error!(error = %e, "failed to create state directories");
        return ExitCode::from(EXIT_IO_OR_CONFIG);
    }

    match run(&args.command, &descriptor, &store) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "command failed");
            let code = match e {
                SupervisorError::UnknownService { .. } => EXIT_UNKNOWN_SERVICE,
                _ => EXIT_IO_OR_CONFIG,
            };
            ExitCode::from(code)
        }
    }
}

fn init_logging(level: tracing::level_filters::LevelFilter) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run(command: &Commands, descriptor: &Descriptor, store: &StateStore) -> Result<u8, SupervisorError> {
    match command {
        Commands::Start { selector } => batch(descriptor, selector, |spec| spawn::start(store, spec, false)),
        Commands::Stop { selector } => batch(descriptor, selector, |spec| stop::stop(store, &spec.name, DEFAULT_STOP_TIMEOUT)),
        Commands::Restart { selector } => batch(descriptor, selector, |spec| restart(store, spec)),
        Commands::Flush { selector } => batch(descriptor, selector, |spec| do_flush(store, spec)),
        Commands::DryRun { selector } => dry_run(descriptor, selector),
        Commands::Log { selector, lines } => tail(descriptor, store, selector, *lines),
        Commands::Ls | Commands::Ps => {
            print_status(descriptor, store);
            Ok(EXIT_OK)
        }
    }
}

fn resolve<'a>(descriptor: &'a Descriptor, selector: &Selector) -> Result<Vec<&'a ServiceSpec>, SupervisorError> {
    match selector {
        Selector::All => Ok(descriptor.services.iter().collect()),
        Selector::Name(name) => descriptor
            .get(name)
            .map(|s| vec![s])
            .ok_or_else(|| SupervisorError::UnknownService { name: name.clone() }),
        Selector::Index(i) => descriptor
            .get_by_index(*i)
            .map(|s| vec![s])
            .ok_or_else(|| SupervisorError::UnknownService { name: i.to_string() }),
    }
}

fn batch<F>(descriptor: &Descriptor, selector: &Selector, mut op: F) -> Result<u8, SupervisorError>
where
    F: FnMut(&ServiceSpec) -> Result<Outcome, SupervisorError>,
{
    let specs = resolve(descriptor, selector)?;
    let mut had_failure = false;
    for spec in specs {
        match op(spec) {
            Ok(outcome) => report_outcome(&spec.name, &outcome),
            Err(e) => {
                error!(service = %spec.name, error = %e, "operation failed");
                had_failure = true;
            }
        }
    }
    Ok(if had_failure { EXIT_PARTIAL_FAILURE } else { EXIT_OK })
}

fn report_outcome(name: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Started { pid } => println!("{name}: started (pid {pid})"),
        Outcome::AlreadyRunning { pid } => println!("{name}: already running (pid {pid})"),
        Outcome::Stopped => println!("{name}: stopped"),
        Outcome::NotRunning => println!("{name}: not running"),
        Outcome::StoppedWithUnkillableDescendants { pids } => {
            warn!(service = name, pids = ?pids, "stopped with surviving descendants");
            println!("{name}: stopped (warning: descendants {pids:?} survived SIGKILL)");
        }
        Outcome::Restarted { pid, restarts } => println!("{name}: restarted (pid {pid}, restarts {restarts})"),
        Outcome::Flushed => println!("{name}: flushed"),
    }
}

fn restart(store: &StateStore, spec: &ServiceSpec) -> Result<Outcome, SupervisorError> {
    stop::stop(store, &spec.name, DEFAULT_STOP_TIMEOUT)?;
    match spawn::start(store, spec, true)? {
        Outcome::Started { pid } | Outcome::AlreadyRunning { pid } => Ok(Outcome::Restarted {
            pid,
            restarts: store.read_restarts(&spec.name),
        }),
        other => Ok(other),
    }
}

fn do_flush(store: &StateStore, spec: &ServiceSpec) -> Result<Outcome, SupervisorError> {
    let running = store.read_pid(&spec.name).map(status::is_alive).unwrap_or(false);
    logs::flush(store, &spec.name, running)?;
    Ok(Outcome::Flushed)
}

fn dry_run(descriptor: &Descriptor, selector: &Selector) -> Result<u8, SupervisorError> {
    let specs = resolve(descriptor, selector)?;
    for spec in specs {
        println!("{}:", spec.name);
        println!("  cmd: {}", spec.cmd);
        println!("  cwd: {}", spec.cwd.display());
        for (k, v) in &spec.env {
            println!("  env: {k}={v}");
        }
    }
    Ok(EXIT_OK)
}

fn tail(descriptor: &Descriptor, store: &StateStore, selector: &Selector, lines: usize) -> Result<u8, SupervisorError> {
    let specs = resolve(descriptor, selector)?;
    let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let (rx, running) = logs::follow_all(store, &names, lines);

    let r = running.clone();
    let _ = ctrlc::set_handler(move || {
        r.store(false, std::sync::atomic::Ordering::Relaxed);
    });

    // Single service: stdout is untagged, only error lines get a visual tag.
    // All services: every line is prefixed with service:kind (§4.5).
    let single_service = specs.len() == 1;

    while running.load(std::sync::atomic::Ordering::Relaxed) {
        match rx.recv_timeout(Duration::from_millis(250)) {
            Ok(line) => {
                if single_service {
                    match line.kind {
                        logs::StreamKind::Stdout => println!("{}", line.content),
                        logs::StreamKind::Stderr => println!("[ERR] {}", line.content),
                    }
                } else {
                    let kind = match line.kind {
                        logs::StreamKind::Stdout => "out",
                        logs::StreamKind::Stderr => "err",
                    };
                    println!("[{}] {}:{kind} {}", line.timestamp.to_rfc3339(), line.service, line.content);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(EXIT_OK)
}

fn print_status(descriptor: &Descriptor, store: &StateStore) {
    let rows = status::status_all(store, &descriptor.services);
    println!("{:<16} {:<8} {:<8} {:<10} {:<8} {:<8}", "NAME", "STATE", "PID", "UPTIME", "CPU%", "MEM");
    for row in rows {
        let state = match row.state {
            status::ServiceState::Running => "running",
            status::ServiceState::Stopped => "stopped",
            status::ServiceState::Stale => "stale",
        };
        let pid = row.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let uptime = row.uptime_secs.map(status::format_uptime).unwrap_or_else(|| "-".to_string());
        let cpu = row.cpu_percent.map(|c| format!("{c:.1}")).unwrap_or_else(|| "-".to_string());
        let mem = row.mem_rss_bytes.map(status::format_bytes).unwrap_or_else(|| "-".to_string());
        println!("{:<16} {:<8} {:<8} {:<10} {:<8} {:<8}", row.name, state, pid, uptime, cpu, mem);
    }
}
