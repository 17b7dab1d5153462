//! Command line arguments and the immutable runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::ConfigError;

/// Time between the starts of two consecutive cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Granularity of the inter-cycle wait.
pub const POLL_STEP: Duration = Duration::from_secs(1);

/// What the loop does when desired or actual state cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FetchErrorPolicy {
    /// Return the error and let the service manager restart us.
    #[default]
    Exit,
    /// Log it and try again on the next tick.
    Skip,
}

/// mvirt Switch - drive VM power state from Home Assistant
#[derive(Parser, Debug, Clone)]
#[command(name = "mvirt-switch", version, about)]
pub struct Args {
    /// Home Assistant base URL (e.g., http://homeassistant.local:8123)
    #[arg(long)]
    pub ha_url: String,

    /// Host prefix; entities are input_boolean.proxmox_<prefix>_<vm name>
    #[arg(long)]
    pub ha_prefix: String,

    /// File containing the Home Assistant long-lived access token
    #[arg(long)]
    pub ha_token_path: PathBuf,

    /// Healthcheck identifier pinged after every successful cycle
    #[arg(long)]
    pub healthcheck: Option<String>,

    /// Base URL the healthcheck identifier is appended to
    #[arg(long, default_value = "https://hc-ping.com")]
    pub healthcheck_base_url: String,

    /// Path to the qm binary
    #[arg(long, default_value = "qm")]
    pub qm_path: PathBuf,

    /// Behavior when Home Assistant or qm cannot be queried
    #[arg(long, value_enum, default_value_t = FetchErrorPolicy::Exit)]
    pub on_fetch_error: FetchErrorPolicy,

    /// Log directives without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Timeout in seconds for HTTP requests (none by default)
    #[arg(long)]
    pub http_timeout: Option<u64>,
}

/// Validated configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub ha_url: String,
    pub ha_token: String,
    pub entity_prefix: String,
    pub healthcheck_url: Option<String>,
    pub qm_path: PathBuf,
    pub on_fetch_error: FetchErrorPolicy,
    pub dry_run: bool,
    pub once: bool,
    pub http_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub poll_step: Duration,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let ha_url = validate_url("--ha-url", &args.ha_url)?;

        if args.ha_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }

        let healthcheck_url = match &args.healthcheck {
            Some(id) if !id.is_empty() => {
                let base = validate_url("--healthcheck-base-url", &args.healthcheck_base_url)?;
                Some(format!("{}/{}", base, id))
            }
            _ => None,
        };

        Ok(Self {
            ha_url,
            ha_token: read_token(&args.ha_token_path)?,
            entity_prefix: entity_prefix(&args.ha_prefix),
            healthcheck_url,
            qm_path: args.qm_path.clone(),
            on_fetch_error: args.on_fetch_error,
            dry_run: args.dry_run,
            once: args.once,
            http_timeout: args.http_timeout.map(Duration::from_secs),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_step: POLL_STEP,
        })
    }
}

/// Full `entity_id` prefix for a host, e.g. `input_boolean.proxmox_vmhost_`.
pub fn entity_prefix(host_prefix: &str) -> String {
    format!("input_boolean.proxmox_{}_", host_prefix)
}

/// Read and trim the bearer token.
pub fn read_token(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadToken {
        path: path.to_path_buf(),
        source,
    })?;

    let token = raw.trim();
    if token.is_empty() {
        return Err(ConfigError::EmptyToken {
            path: path.to_path_buf(),
        });
    }
    Ok(token.to_string())
}

fn validate_url(option: &'static str, value: &str) -> Result<String, ConfigError> {
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl {
            option,
            value: value.to_string(),
        });
    }
    Ok(value.trim_end_matches('/').to_string())
}
