//! Application-level configuration loading, including the gameplay timing knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAME_SHOW_BACK_CONFIG_PATH";

/// Seconds between the start acknowledgment and the first question broadcast.
const DEFAULT_COUNTDOWN_SECONDS: u64 = 5;
/// Seconds between `question_ended` and the next question broadcast.
const DEFAULT_INTER_ROUND_PAUSE_SECONDS: u64 = 5;
/// Extra milliseconds granted to the deadline timer to absorb scheduling jitter.
const DEFAULT_DEADLINE_SLACK_MS: u64 = 100;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    countdown_seconds: u64,
    inter_round_pause_seconds: u64,
    deadline_slack_ms: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        countdown = app_config.countdown_seconds,
                        inter_round_pause = app_config.inter_round_pause_seconds,
                        "loaded gameplay timing from config"
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

    /// Construct a configuration with explicit timings, bypassing the file lookup.
    pub fn with_timings(
        countdown_seconds: u64,
        inter_round_pause_seconds: u64,
        deadline_slack_ms: u64,
    ) -> Self {
        Self {
            countdown_seconds,
            inter_round_pause_seconds,
            deadline_slack_ms,
        }
    }

    /// Countdown announced to clients before the first question broadcast.
    pub fn countdown_seconds(&self) -> u64 {
        self.countdown_seconds
    }

    /// Delay between rounds while clients display round results.
    pub fn inter_round_pause(&self) -> Duration {
        Duration::from_secs(self.inter_round_pause_seconds)
    }

    /// Deadline for a question given its time limit, including the jitter slack.
    pub fn question_deadline(&self, time_limit_seconds: u32) -> Duration {
        Duration::from_millis(u64::from(time_limit_seconds) * 1000 + self.deadline_slack_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            inter_round_pause_seconds: DEFAULT_INTER_ROUND_PAUSE_SECONDS,
            deadline_slack_ms: DEFAULT_DEADLINE_SLACK_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    countdown_seconds: Option<u64>,
    #[serde(default)]
    inter_round_pause_seconds: Option<u64>,
    #[serde(default)]
    deadline_slack_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            countdown_seconds: value.countdown_seconds.unwrap_or(DEFAULT_COUNTDOWN_SECONDS),
            inter_round_pause_seconds: value
                .inter_round_pause_seconds
                .unwrap_or(DEFAULT_INTER_ROUND_PAUSE_SECONDS),
            deadline_slack_ms: value.deadline_slack_ms.unwrap_or(DEFAULT_DEADLINE_SLACK_MS),
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
