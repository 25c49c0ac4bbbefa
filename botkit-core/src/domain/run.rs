//! Run domain types
//!
//! A run is one invocation of the bot binary. Its context is built once,
//! before the runner starts, and never changes afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Where the task body gets its parameters from and where results go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Run without contacting the orchestration service
    Local,
    /// Run against a remote task record
    #[default]
    Orchestrated,
}

impl ExecutionMode {
    /// Command-line spelling of the local mode
    pub const LOCAL_FLAG: &'static str = "local";
    /// Command-line spelling of the orchestrated mode
    pub const ORCHESTRATED_FLAG: &'static str = "maestro";

    pub fn as_flag(&self) -> &'static str {
        match self {
            ExecutionMode::Local => Self::LOCAL_FLAG,
            ExecutionMode::Orchestrated => Self::ORCHESTRATED_FLAG,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// The execution-mode flag held a value other than `maestro` or `local`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid execution mode '{value}' (expected 'maestro' or 'local')")]
pub struct InvalidModeError {
    pub value: String,
}

impl FromStr for ExecutionMode {
    type Err = InvalidModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::ORCHESTRATED_FLAG => Ok(ExecutionMode::Orchestrated),
            Self::LOCAL_FLAG => Ok(ExecutionMode::Local),
            other => Err(InvalidModeError {
                value: other.to_string(),
            }),
        }
    }
}

/// Immutable facts about the current invocation
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    mode: ExecutionMode,
    bot_id: String,
    log_dir: PathBuf,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Creates a context stamped with the current time
    pub fn new(mode: ExecutionMode, bot_id: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            bot_id: bot_id.into(),
            log_dir: log_dir.into(),
            started_at: Utc::now(),
        }
    }

    /// Unique id of this invocation, written into the run log header
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_modes() {
        assert_eq!("maestro".parse::<ExecutionMode>(), Ok(ExecutionMode::Orchestrated));
        assert_eq!("local".parse::<ExecutionMode>(), Ok(ExecutionMode::Local));
    }

    #[test]
    fn test_parse_rejects_other_values() {
        for value in ["", "LOCAL", "production", "test", " maestro"] {
            let err = value.parse::<ExecutionMode>().unwrap_err();
            assert_eq!(err.value, value);
        }
    }

    #[test]
    fn test_flag_round_trip() {
        for mode in [ExecutionMode::Local, ExecutionMode::Orchestrated] {
            assert_eq!(mode.as_flag().parse::<ExecutionMode>(), Ok(mode));
        }
        assert_eq!(ExecutionMode::default(), ExecutionMode::Orchestrated);
    }

    #[test]
    fn test_run_context_accessors() {
        let ctx = RunContext::new(ExecutionMode::Local, "invoice-bot", "logs");
        assert_eq!(ctx.mode(), ExecutionMode::Local);
        assert_eq!(ctx.bot_id(), "invoice-bot");
        assert_eq!(ctx.log_dir(), Path::new("logs"));
        assert!(ctx.started_at() <= Utc::now());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunContext::new(ExecutionMode::Local, "bot", "logs");
        let b = RunContext::new(ExecutionMode::Local, "bot", "logs");
        assert_ne!(a.run_id(), b.run_id());
    }
}
