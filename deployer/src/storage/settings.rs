//! Handler settings
//!
//! Lambda functions are configured through environment variables, so the
//! settings are read from `LEXDEPLOY_*` variables with a default for each.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deploy::waiter::{Backoff, PollPolicy};
use crate::errors::DeployerError;
use crate::logs::{LogLevel, LogOptions};
use crate::utils::CooldownOptions;

/// Prefix shared by every settings variable
pub const ENV_PREFIX: &str = "LEXDEPLOY_";

/// Deployer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines
    #[serde(default = "default_true")]
    pub json_logs: bool,

    /// Directory used to stage the downloaded archive
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Archive key used when the resource omits `Filename`
    #[serde(default = "default_filename")]
    pub default_filename: String,

    /// Status polling configuration
    #[serde(default)]
    pub poll: PollSettings,

    /// Timeout for the CloudFormation callback request in seconds
    #[serde(default = "default_callback_timeout")]
    pub callback_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_filename() -> String {
    "lex.zip".to_string()
}

fn default_callback_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: true,
            scratch_dir: default_scratch_dir(),
            default_filename: default_filename(),
            poll: PollSettings::default(),
            callback_timeout_secs: default_callback_timeout(),
        }
    }
}

/// Backoff shape between status polls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// attempt * step
    #[default]
    Linear,
    /// step * 2^(attempt - 1), capped
    Exponential,
}

impl std::str::FromStr for BackoffKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(BackoffKind::Linear),
            "exponential" | "exp" => Ok(BackoffKind::Exponential),
            _ => Err(format!("Invalid backoff: {}", s)),
        }
    }
}

/// Status polling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Number of status reads before giving up silently
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff shape
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Base step in seconds
    #[serde(default = "default_step_secs")]
    pub step_secs: u64,

    /// Upper bound for a single exponential sleep in seconds
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    20
}

fn default_step_secs() -> u64 {
    1
}

fn default_max_delay_secs() -> u64 {
    30
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffKind::Linear,
            step_secs: default_step_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl PollSettings {
    /// Backoff described by these settings
    pub fn backoff(&self) -> Backoff {
        let step = Duration::from_secs(self.step_secs);
        match self.backoff {
            BackoffKind::Linear => Backoff::Linear { step },
            BackoffKind::Exponential => Backoff::Exponential(CooldownOptions {
                base_delay: step,
                max_delay: Duration::from_secs(self.max_delay_secs),
                multiplier: 2.0,
            }),
        }
    }

    /// Apply attempts and backoff to a per-wait status policy
    pub fn apply(&self, policy: PollPolicy) -> PollPolicy {
        policy
            .with_max_attempts(self.max_attempts)
            .with_backoff(self.backoff())
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, DeployerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, which receives full variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Settings::default();

        if let Some(v) = var("LOG_LEVEL") {
            settings.log_level = v.parse().map_err(DeployerError::ConfigError)?;
        }
        if let Some(v) = var("LOG_JSON") {
            settings.json_logs = parse_value("LOG_JSON", &v)?;
        }
        if let Some(v) = var("SCRATCH_DIR") {
            settings.scratch_dir = PathBuf::from(v);
        }
        if let Some(v) = var("DEFAULT_FILENAME") {
            settings.default_filename = v;
        }
        if let Some(v) = var("POLL_MAX_ATTEMPTS") {
            settings.poll.max_attempts = parse_value("POLL_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = var("POLL_BACKOFF") {
            settings.poll.backoff = v.parse().map_err(DeployerError::ConfigError)?;
        }
        if let Some(v) = var("POLL_STEP_SECS") {
            settings.poll.step_secs = parse_value("POLL_STEP_SECS", &v)?;
        }
        if let Some(v) = var("POLL_MAX_DELAY_SECS") {
            settings.poll.max_delay_secs = parse_value("POLL_MAX_DELAY_SECS", &v)?;
        }
        if let Some(v) = var("CALLBACK_TIMEOUT_SECS") {
            settings.callback_timeout_secs = parse_value("CALLBACK_TIMEOUT_SECS", &v)?;
        }

        if settings.poll.max_attempts == 0 {
            return Err(DeployerError::ConfigError(format!(
                "{}POLL_MAX_ATTEMPTS must be at least 1",
                ENV_PREFIX
            )));
        }

        Ok(settings)
    }

    /// Logging options derived from these settings
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            json_format: self.json_logs,
            ..Default::default()
        }
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, DeployerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        DeployerError::ConfigError(format!("{}{}={}: {}", ENV_PREFIX, name, value, e))
    })
}
