//! Runner configuration
//!
//! Defines all configurable parameters for a bot run: identity, log
//! location, orchestration credentials, notification target and resource
//! sampling options.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// What to do when login to the orchestration service fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthFailurePolicy {
    /// Stop before the task body runs (exit code 1)
    #[default]
    Abort,
    /// Run the task body with empty parameters, still try to report status
    SkipFetch,
    /// Run the task body with empty parameters, make no orchestration calls
    Detached,
}

impl AuthFailurePolicy {
    /// Whether the run goes on after a failed login
    pub fn continues(&self) -> bool {
        !matches!(self, AuthFailurePolicy::Abort)
    }
}

impl FromStr for AuthFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(AuthFailurePolicy::Abort),
            "skip-fetch" | "skip_fetch" => Ok(AuthFailurePolicy::SkipFetch),
            "detached" => Ok(AuthFailurePolicy::Detached),
            other => Err(format!(
                "unknown policy '{}' (expected abort, skip-fetch or detached)",
                other
            )),
        }
    }
}

/// Connection settings for the orchestration service
#[derive(Debug, Clone, Default)]
pub struct OrchestratorSettings {
    /// Service base URL (e.g., "https://orchestrator.example.com")
    pub url: Option<String>,
    pub login: Option<String>,
    pub key: Option<String>,
    /// Remote task this execution belongs to
    pub task_id: Option<u64>,
}

/// Messaging target for failure alerts
#[derive(Debug, Clone, Default)]
pub struct TelegramSettings {
    /// Bot token; in orchestrated mode it can come from the credential store instead
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot identifier, used in log file names and alerts
    pub bot_name: String,

    /// Directory holding one log file per run
    pub log_dir: PathBuf,

    /// Directory the finished log file is copied to, if set
    pub log_archive_dir: Option<PathBuf>,

    /// Extra task-body attempts after a failure
    pub max_retries: u32,

    pub orchestrator: OrchestratorSettings,

    pub auth_failure_policy: AuthFailurePolicy,

    pub telegram: TelegramSettings,

    /// Query GPUs when sampling resources
    pub sample_gpu: bool,

    /// Window between the two CPU counter readings of one sample
    pub cpu_sample_interval: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(bot_name: String) -> Self {
        Self {
            bot_name,
            log_dir: PathBuf::from("logs"),
            log_archive_dir: None,
            max_retries: 0,
            orchestrator: OrchestratorSettings::default(),
            auth_failure_policy: AuthFailurePolicy::Abort,
            telegram: TelegramSettings::default(),
            sample_gpu: true,
            cpu_sample_interval: Duration::from_secs(1),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - BOT_NAME (default: "bot")
    /// - LOG_DIR (default: "logs")
    /// - LOG_ARCHIVE_DIR
    /// - MAX_RETRIES (default: 0)
    /// - ORCHESTRATOR_URL, ORCHESTRATOR_LOGIN, ORCHESTRATOR_KEY, ORCHESTRATOR_TASK_ID
    /// - AUTH_FAILURE_POLICY (abort | skip-fetch | detached, default: abort)
    /// - TELEGRAM_TOKEN, TELEGRAM_CHAT_ID
    /// - SAMPLE_GPU (default: true)
    /// - CPU_SAMPLE_INTERVAL_MS (default: 1000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(var("BOT_NAME").unwrap_or_else(|| "bot".to_string()));

        if let Some(dir) = var("LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        config.log_archive_dir = var("LOG_ARCHIVE_DIR").map(PathBuf::from);

        config.max_retries = var("MAX_RETRIES")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        config.orchestrator = OrchestratorSettings {
            url: var("ORCHESTRATOR_URL"),
            login: var("ORCHESTRATOR_LOGIN"),
            key: var("ORCHESTRATOR_KEY"),
            task_id: match var("ORCHESTRATOR_TASK_ID") {
                Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue {
                        key: "ORCHESTRATOR_TASK_ID",
                        reason: e.to_string(),
                    }
                })?),
                None => None,
            },
        };

        if let Some(raw) = var("AUTH_FAILURE_POLICY") {
            config.auth_failure_policy =
                raw.parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        key: "AUTH_FAILURE_POLICY",
                        reason,
                    })?;
        }

        config.telegram = TelegramSettings {
            token: var("TELEGRAM_TOKEN"),
            chat_id: var("TELEGRAM_CHAT_ID"),
        };

        config.sample_gpu = var("SAMPLE_GPU")
            .map(|s| !matches!(s.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        config.cpu_sample_interval = var("CPU_SAMPLE_INTERVAL_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(1));

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::Invalid("bot_name cannot be empty".to_string()));
        }

        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("log_dir cannot be empty".to_string()));
        }

        if let Some(url) = &self.orchestrator.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(
                    "orchestrator url must start with http:// or https://".to_string(),
                ));
            }
        }

        if self.cpu_sample_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "cpu_sample_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("bot".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bot_name, "bot");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::Abort);
        assert_eq!(config.cpu_sample_interval, Duration::from_secs(1));
        assert!(config.sample_gpu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_all_settings() {
        let config = Config::from_lookup(lookup(&[
            ("BOT_NAME", "invoice-bot"),
            ("LOG_DIR", "/var/log/bots"),
            ("MAX_RETRIES", "2"),
            ("ORCHESTRATOR_URL", "https://orchestrator.example.com"),
            ("ORCHESTRATOR_LOGIN", "bot-user"),
            ("ORCHESTRATOR_KEY", "secret"),
            ("ORCHESTRATOR_TASK_ID", "981"),
            ("AUTH_FAILURE_POLICY", "skip-fetch"),
            ("TELEGRAM_CHAT_ID", "-100200"),
            ("SAMPLE_GPU", "false"),
            ("CPU_SAMPLE_INTERVAL_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.bot_name, "invoice-bot");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/bots"));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.orchestrator.task_id, Some(981));
        assert_eq!(config.orchestrator.login.as_deref(), Some("bot-user"));
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::SkipFetch);
        assert_eq!(config.telegram.chat_id.as_deref(), Some("-100200"));
        assert_eq!(config.telegram.token, None);
        assert!(!config.sample_gpu);
        assert_eq!(config.cpu_sample_interval, Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[("BOT_NAME", "  "), ("TELEGRAM_TOKEN", "")]))
            .unwrap();
        assert_eq!(config.bot_name, "bot");
        assert_eq!(config.telegram.token, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_lookup(lookup(&[("ORCHESTRATOR_TASK_ID", "abc")])).is_err());
        assert!(Config::from_lookup(lookup(&[("AUTH_FAILURE_POLICY", "ignore")])).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.bot_name = String::new();
        assert!(config.validate().is_err());
        config.bot_name = "bot".to_string();

        config.orchestrator.url = Some("not-a-url".to_string());
        assert!(config.validate().is_err());
        config.orchestrator.url = Some("http://localhost:8080".to_string());
        assert!(config.validate().is_ok());

        config.cpu_sample_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("abort".parse::<AuthFailurePolicy>(), Ok(AuthFailurePolicy::Abort));
        assert_eq!("Detached".parse::<AuthFailurePolicy>(), Ok(AuthFailurePolicy::Detached));
        assert_eq!("skip_fetch".parse::<AuthFailurePolicy>(), Ok(AuthFailurePolicy::SkipFetch));
        assert!(!AuthFailurePolicy::Abort.continues());
        assert!(AuthFailurePolicy::Detached.continues());
    }
}
