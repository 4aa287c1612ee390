//! Config Resolver: loads a YAML descriptor and the sibling dotenv layer,
//! and normalizes them into a uniform [`ServiceSpec`] set.
//!
//! Grounded on the teacher's `config.rs` `EnvConfig`/`load_config` merge
//! pipeline, trimmed to the spec's much smaller `ServiceSpec` (no restart
//! policies, limits, capabilities, deployment strategy, cron, or hooks —
//! all Non-goals here).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::constants::{DEFAULT_ENV_FILE_NAME, RESERVED_SERVICE_NAME};
use crate::error::{Result, SupervisorError};

/// One entry in the descriptor's top-level mapping, before normalization.
/// A bare string is shorthand for `{cmd: <string>}`; the teacher's
/// `ServiceConfig` carries many more fields (limits, isolation, hooks,
/// cron, restart policy) that are all Non-goals here and are dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ServiceValue {
    Shorthand(String),
    Full(ServiceValueFull),
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceValueFull {
    cmd: Option<String>,
    /// Legacy alias for `cmd`, retained for backward compatibility; `cmd`
    /// is preferred in messages and tooling.
    script: Option<String>,
    cwd: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

/// A fully normalized, resolved service ready to be handed to the Process
/// Runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub cmd: String,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

/// The result of resolving a descriptor: services in descriptor order
/// (used for the CLI's numeric-id selector) plus the names skipped with a
/// warning.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    pub services: Vec<ServiceSpec>,
    pub skipped_reserved: Vec<String>,
}

impl Descriptor {
    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn get_by_index(&self, index: usize) -> Option<&ServiceSpec> {
        self.services.get(index)
    }
}

/// Loads and normalizes a descriptor at `path`, merging in the dotenv layer
/// from the same directory if present. `path`'s parent directory is used
/// to resolve relative `cwd`s (§4.1 step 5).
pub fn load(path: &Path) -> Result<Descriptor> {
    let raw = std::fs::read_to_string(path).map_err(|source| SupervisorError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let doc: serde_yaml::Value =
        serde_yaml::from_str(&raw).map_err(|source| SupervisorError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    let mapping = match doc {
        serde_yaml::Value::Mapping(m) => m,
        _ => {
            return Err(SupervisorError::ConfigNotAMapping {
                path: path.to_path_buf(),
            })
        }
    };

    let descriptor_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let dotenv = load_dotenv(&descriptor_dir.join(DEFAULT_ENV_FILE_NAME));

    let mut services = Vec::new();
    let mut skipped_reserved = Vec::new();

    for (key, value) in mapping {
        let name = match key.as_str() {
            Some(n) => n.to_string(),
            None => continue,
        };

        if name == RESERVED_SERVICE_NAME {
            warn!(service = %name, "skipping reserved service name");
            skipped_reserved.push(name);
            continue;
        }

        let parsed: ServiceValue = match serde_yaml::from_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(service = %name, error = %e, "skipping malformed service entry");
                continue;
            }
        };

        let (cmd, cwd, own_env) = match parsed {
            ServiceValue::Shorthand(cmd) => (cmd, None, HashMap::new()),
            ServiceValue::Full(full) => {
                let cmd = match full.cmd.or(full.script) {
                    Some(c) => c,
                    None => {
                        warn!(service = %name, "skipping service with no cmd/script");
                        continue;
                    }
                };
                (cmd, full.cwd, full.env)
            }
        };

        let resolved_cwd = match &cwd {
            Some(c) => {
                let p = PathBuf::from(c);
                if p.is_relative() {
                    descriptor_dir.join(p)
                } else {
                    p
                }
            }
            None => descriptor_dir.clone(),
        };

        let env = merge_env(&dotenv, &own_env);

        services.push(ServiceSpec {
            name,
            cmd,
            cwd: resolved_cwd,
            env,
        });
    }

    Ok(Descriptor {
        services,
        skipped_reserved,
    })
}

/// parent process environment ⊕ dotenv layer ⊕ spec `env` (later wins).
fn merge_env(dotenv: &HashMap<String, String>, spec_env: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut merged: HashMap<String, String> = std::env::vars().collect();
    for (k, v) in dotenv {
        merged.insert(k.clone(), v.clone());
    }
    for (k, v) in spec_env {
        merged.insert(k.clone(), v.clone());
    }
    let mut pairs: Vec<(String, String)> = merged.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
}

/// Reads a `.env`-style file into an ordered mapping. Never fails the
/// overall descriptor load: a missing file is silently treated as empty,
/// matching §4.1's "missing dotenv → silently skipped".
fn load_dotenv(path: &Path) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return vars,
    };

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = unquote(value.trim());
        vars.insert(key.to_string(), value);
    }
    vars
}

fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}
