//! Botkit Runner
//!
//! Runs an RPA task body either locally or against a task record of the
//! orchestration service.
//!
//! Architecture:
//! - Configuration: environment variables, overridden by CLI flags
//! - Mode selection: `--environment` picks the local or orchestrated runner
//! - Runners: run the task body and report its outcome
//! - Resource logging: CPU/RAM/GPU samples at entry and exit of every run
//! - Notifications: failure alert with the run log attached
//!
//! Every run writes one log file; `tracing` output and structured records
//! both end up in it.

pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod logging;
pub mod mode;
pub mod notify;
pub mod resource;
pub mod runner;
pub mod task;

pub use config::{AuthFailurePolicy, Config};
pub use mode::{DefaultRunnerFactory, ModeSelector, RunnerFactory};
pub use runner::{BotRunner, RunOutcome, RunServices};
pub use task::{SampleTask, TaskBody};
