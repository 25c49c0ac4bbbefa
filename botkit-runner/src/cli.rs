//! Command-line interface
//!
//! Flags override the environment configuration loaded by
//! [`Config::from_env`].

use botkit_core::domain::task::TaskParameters;
use clap::Parser;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "botkit")]
#[command(about = "RPA bot runner", long_about = None)]
pub struct Cli {
    /// Execution mode: "maestro" (orchestrated) or "local"
    #[arg(long, env = "BOT_ENVIRONMENT", default_value = "maestro")]
    pub environment: String,

    /// Task parameter for local runs, repeatable (values are parsed as JSON when possible)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, JsonValue)>,

    /// Bot identifier used in log file names and alerts
    #[arg(long)]
    pub bot_name: Option<String>,

    /// Directory for run log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Extra task-body attempts after a failure
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Remote task id (orchestrated mode)
    #[arg(long)]
    pub task_id: Option<u64>,
}

impl Cli {
    /// Applies flag overrides on top of `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(bot_name) = &self.bot_name {
            config.bot_name = bot_name.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(task_id) = self.task_id {
            config.orchestrator.task_id = Some(task_id);
        }
    }

    /// Local task parameters; later flags win on duplicate keys
    pub fn task_parameters(&self) -> TaskParameters {
        self.params.iter().cloned().collect()
    }
}

fn parse_param(raw: &str) -> Result<(String, JsonValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((key.to_string(), value))
}
