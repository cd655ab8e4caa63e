//! Application-level configuration loading: game rules and operational timings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::game::AcceptancePolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "NUMBER_HUNT_CONFIG_PATH";

const DEFAULT_POST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CHANNEL_MARKER: char = '@';
const DEFAULT_DELETE_ATTEMPTS: u32 = 3;
const DEFAULT_DELETE_RETRY_DELAY_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Rule deciding which claimed numbers advance a group's counter.
    pub acceptance_policy: AcceptancePolicy,
    /// Upper bound for a single transport call.
    pub post_timeout: Duration,
    /// Leading character every public channel handle must carry.
    pub channel_marker: char,
    /// How many times each key deletion is attempted during a reset.
    pub delete_attempts: u32,
    /// Delay before the first deletion retry; doubled on every retry.
    pub delete_retry_delay: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        policy = ?app_config.acceptance_policy,
                        post_timeout_ms = app_config.post_timeout.as_millis() as u64,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    acceptance_policy: AcceptancePolicy,
    post_timeout_ms: u64,
    channel_marker: char,
    delete_attempts: u32,
    delete_retry_delay_ms: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            acceptance_policy: AcceptancePolicy::default(),
            post_timeout_ms: DEFAULT_POST_TIMEOUT_MS,
            channel_marker: DEFAULT_CHANNEL_MARKER,
            delete_attempts: DEFAULT_DELETE_ATTEMPTS,
            delete_retry_delay_ms: DEFAULT_DELETE_RETRY_DELAY_MS,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            acceptance_policy: value.acceptance_policy,
            post_timeout: Duration::from_millis(value.post_timeout_ms),
            channel_marker: value.channel_marker,
            delete_attempts: value.delete_attempts.max(1),
            delete_retry_delay: Duration::from_millis(value.delete_retry_delay_ms),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
