//! Load config from file and environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tcpickle_core::{RetryPolicy, DEFAULT_HOST, DEFAULT_PORT};

/// Host configuration. File: ~/.config/tcpickle/config.toml or /etc/tcpickle/config.toml.
/// Env overrides: TCPICKLE_HOST, TCPICKLE_PORT, TCPICKLE_RETRY_MS, TCPICKLE_FETCH_PAUSE_MS.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Host to bind (serve) or connect to (fetch).
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wait between attempts while the server refuses connections.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Pause between two fetches.
    #[serde(default = "default_fetch_pause_ms")]
    pub fetch_pause_ms: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_retry_interval_ms() -> u64 {
    1000
}
fn default_fetch_pause_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            retry_interval_ms: default_retry_interval_ms(),
            fetch_pause_ms: default_fetch_pause_ms(),
        }
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.retry_interval_ms),
            max_attempts: None,
        }
    }

    pub fn fetch_pause(&self) -> Duration {
        Duration::from_millis(self.fetch_pause_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load config: defaults, then the first config file found, then env vars.
/// A config file that exists but does not parse is an error.
pub fn load() -> Result<Config, ConfigError> {
    let mut c = match config_paths().into_iter().find(|p| p.exists()) {
        Some(p) => load_file(&p)?,
        None => Config::default(),
    };
    apply_env(&mut c, |key| std::env::var(key).ok());
    Ok(c)
}

fn apply_env(c: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(h) = var("TCPICKLE_HOST") {
        if !h.is_empty() {
            c.host = h;
        }
    }
    if let Some(p) = var("TCPICKLE_PORT").and_then(|s| s.parse::<u16>().ok()) {
        c.port = p;
    }
    if let Some(ms) = var("TCPICKLE_RETRY_MS").and_then(|s| s.parse::<u64>().ok()) {
        c.retry_interval_ms = ms;
    }
    if let Some(ms) = var("TCPICKLE_FETCH_PAUSE_MS").and_then(|s| s.parse::<u64>().ok()) {
        c.fetch_pause_ms = ms;
    }
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/tcpickle/config.toml"));
    }
    out.push(PathBuf::from("/etc/tcpickle/config.toml"));
    out
}

fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<Config>(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let c: Config = toml::from_str("port = 6000").unwrap();
        assert_eq!(c.port, 6000);
        assert_eq!(c.host, "localhost");
        assert_eq!(c.retry_interval_ms, 1000);
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(toml::from_str::<Config>("magic = \"sauerkraut\"").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [
            ("TCPICKLE_HOST", "127.0.0.1"),
            ("TCPICKLE_PORT", "6001"),
            ("TCPICKLE_RETRY_MS", "not-a-number"),
            ("TCPICKLE_FETCH_PAUSE_MS", "0"),
        ]
        .into_iter()
        .collect();
        let mut c = Config::default();
        apply_env(&mut c, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.host, "127.0.0.1");
        assert_eq!(c.port, 6001);
        assert_eq!(c.retry_interval_ms, 1000);
        assert_eq!(c.fetch_pause(), Duration::ZERO);
    }

    #[test]
    fn retry_policy_is_unbounded() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, None);
    }

    #[test]
    fn bad_file_is_parse_error() {
        let path = std::env::temp_dir().join(format!("tcpickle-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "port = \"high\"").unwrap();
        let res = load_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }
}
