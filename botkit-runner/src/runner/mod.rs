//! Bot runners
//!
//! A runner drives one invocation of the bot: it runs the task body inside
//! the resource logging window, records the outcome in the run log and,
//! when orchestrated, reports it to the orchestration service.

mod local;
mod orchestrated;

pub use local::LocalRunner;
pub use orchestrated::{OrchestratedRunner, OrchestrationApi, OrchestratorConnection};

use async_trait::async_trait;
use botkit_core::domain::log::LogRecord;
use botkit_core::domain::run::{ExecutionMode, RunContext};
use botkit_core::domain::task::{TaskOutput, TaskParameters};
use std::any::Any;
use std::sync::Arc;

use crate::error::TaskExecutionError;
use crate::journal::RunLog;
use crate::notify::NotificationSink;
use crate::resource::ResourceLogger;
use crate::task::TaskBody;

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure { reason: String },
}

impl RunOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        RunOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// Process exit code: 0 on success, 1 on failure
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failure { .. } => 1,
        }
    }
}

/// Shared plumbing handed to a runner for one run
pub struct RunServices {
    pub log: RunLog,
    pub resources: ResourceLogger,
    pub notifications: NotificationSink,
    /// Extra task-body attempts after a failure
    pub max_retries: u32,
}

/// One execution strategy for the task body
#[async_trait]
pub trait BotRunner: Send {
    fn mode(&self) -> ExecutionMode;

    /// Runs the bot once
    ///
    /// Never returns an error: every failure is logged and folded into the
    /// outcome.
    async fn run(&mut self, ctx: RunContext, services: RunServices) -> RunOutcome;
}

/// Runs the task body, retrying up to `max_retries` times
///
/// Each attempt runs in its own tokio task so a panic ends up as a
/// [`TaskExecutionError`] instead of tearing down the runner. Failed
/// attempts that are retried are logged as warnings.
pub async fn execute_task(
    body: &Arc<dyn TaskBody>,
    params: &TaskParameters,
    max_retries: u32,
    log: &RunLog,
) -> Result<TaskOutput, TaskExecutionError> {
    let attempts = max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match run_attempt(body.clone(), params.clone()).await {
            Ok(output) => return Ok(output),
            Err((message, trace)) if attempt < attempts => {
                log.append(
                    LogRecord::warning(format!(
                        "Attempt {}/{} failed, retrying: {}",
                        attempt, attempts, message
                    ))
                    .with_trace(trace),
                );
                attempt += 1;
            }
            Err((message, trace)) => {
                return Err(TaskExecutionError {
                    message,
                    trace,
                    attempts: attempt,
                });
            }
        }
    }
}

async fn run_attempt(
    body: Arc<dyn TaskBody>,
    params: TaskParameters,
) -> Result<TaskOutput, (String, String)> {
    let handle = tokio::spawn(async move { body.execute(&params).await });

    match handle.await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err((format!("{:#}", err), format!("{:?}", err))),
        Err(join_err) if join_err.is_panic() => {
            let payload = panic_message(join_err.into_panic());
            Err((
                format!("task body panicked: {}", payload),
                format!("panic: {}", payload),
            ))
        }
        Err(join_err) => Err((join_err.to_string(), join_err.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(_) => "non-string panic payload".to_string(),
    }
}

/// Human-readable tail for completion messages
fn describe_output(output: &TaskOutput) -> String {
    let mut parts = Vec::new();
    if let Some(items) = output.items_processed {
        parts.push(format!("items processed: {}", items));
    }
    if let Some(summary) = &output.summary {
        parts.push(summary.clone());
    }
    parts.join(", ")
}
