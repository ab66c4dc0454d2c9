//! Configuration and persistent stores for enbp.
//!
//! TOML + environment configuration layered with figment, translation to
//! `enbp_core::CoreConfig`, and the on-disk / keyring backends for the
//! core's `StateStore` and `SecretStore` seams.

mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use enbp_core::{CLOUD_API_URL, CoreConfig, TlsVerification};

pub use store::{FileStateStore, KeyringSecretStore, SECRET_SERVICE};

const ENV_PREFIX: &str = "ENBP_";
const STATE_FILE: &str = "state.json";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("state file {path} is corrupt: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the Enapter Cloud API.
    #[serde(default = "default_cloud_url")]
    pub cloud_url: String,

    /// Device refresh period for `watch`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accept self-signed certificates (gateways ship with one).
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Custom CA certificate, used when `insecure` is off.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Where persisted sites and device caches live.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Default output format: "table", "json" or "yaml".
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloud_url: default_cloud_url(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            insecure: default_insecure(),
            ca_cert: None,
            state_dir: None,
            output: default_output(),
        }
    }
}

fn default_cloud_url() -> String {
    CLOUD_API_URL.into()
}
fn default_poll_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    30
}
fn default_insecure() -> bool {
    true
}
fn default_output() -> String {
    "table".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "enapter", "enbp")
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("enbp");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Resolve the state file, honouring `state_dir`.
pub fn state_path(config: &Config) -> PathBuf {
    let dir = config.state_dir.clone().unwrap_or_else(|| {
        project_dirs().map_or_else(
            || home_fallback(".local/share"),
            |dirs| dirs.data_dir().to_path_buf(),
        )
    });
    dir.join(STATE_FILE)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load defaults → config file → `ENBP_*` environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Like [`load_config`] with an explicit file. A missing file is fine.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config", "gateway_token", "cloud_token"]));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Render the effective config as TOML.
pub fn render_config(config: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the runtime `CoreConfig`.
pub fn to_core_config(config: &Config) -> Result<CoreConfig, ConfigError> {
    let url: url::Url = config
        .cloud_url
        .parse()
        .map_err(|e| ConfigError::Validation {
            field: "cloud_url".into(),
            reason: format!("invalid URL {:?}: {e}", config.cloud_url),
        })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "cloud_url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    if config.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval_secs".into(),
            reason: "must be at least 1".into(),
        });
    }

    let tls = if config.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = config.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(CoreConfig {
        cloud_url: config.cloud_url.clone(),
        tls,
        timeout: Duration::from_secs(config.timeout_secs),
        poll_interval: Duration::from_secs(config.poll_interval_secs),
    })
}
