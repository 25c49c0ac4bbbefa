//! Runner for executions outside the orchestration service

use async_trait::async_trait;
use botkit_core::domain::log::LogRecord;
use botkit_core::domain::run::{ExecutionMode, RunContext};
use botkit_core::domain::task::TaskParameters;
use std::sync::Arc;

use super::{BotRunner, RunOutcome, RunServices, describe_output, execute_task};
use crate::task::TaskBody;

/// Runs the task body with locally supplied parameters
pub struct LocalRunner {
    body: Arc<dyn TaskBody>,
    params: TaskParameters,
}

impl LocalRunner {
    pub fn new(body: Arc<dyn TaskBody>, params: TaskParameters) -> Self {
        Self { body, params }
    }
}

#[async_trait]
impl BotRunner for LocalRunner {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Local
    }

    async fn run(&mut self, ctx: RunContext, services: RunServices) -> RunOutcome {
        let log = &services.log;
        log.info(format!(
            "Bot '{}' execution started (mode: {}, run: {})",
            ctx.bot_id(),
            ctx.mode(),
            ctx.run_id()
        ));

        let (result, report) = services
            .resources
            .measure(execute_task(
                &self.body,
                &self.params,
                services.max_retries,
                log,
            ))
            .await;

        match result {
            Ok(output) => {
                let details = describe_output(&output);
                if details.is_empty() {
                    log.info(format!("Bot '{}' execution completed", ctx.bot_id()));
                } else {
                    log.info(format!(
                        "Bot '{}' execution completed ({})",
                        ctx.bot_id(),
                        details
                    ));
                }
                log.info(format!("Execution time: {}", report.elapsed_display()));
                RunOutcome::Success
            }
            Err(err) => {
                log.append(
                    LogRecord::error(format!("Bot '{}' execution failed: {}", ctx.bot_id(), err))
                        .with_trace(err.trace.clone()),
                );
                log.info(format!("Execution time: {}", report.elapsed_display()));
                services
                    .notifications
                    .notify_failure(&err.message, log.path())
                    .await;
                RunOutcome::failure(err.to_string())
            }
        }
    }
}
