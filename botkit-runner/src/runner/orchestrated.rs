//! Runner for executions driven by the orchestration service
//!
//! Flow of a run:
//! 1. Log in with the configured credentials
//! 2. Fetch the task record (parameters)
//! 3. Run the task body inside the resource logging window
//! 4. Mark the task finished or post the error and mark it failed
//! 5. Upload the run log as an artifact of the task
//!
//! Every reporting step is attempted even when an earlier one failed. A
//! failed status update or upload makes the run fail; nothing is retried.

use async_trait::async_trait;
use botkit_client::{ClientError, OrchestratorClient, TelegramClient};
use botkit_core::domain::log::LogRecord;
use botkit_core::domain::run::{ExecutionMode, RunContext};
use botkit_core::domain::task::{TaskOutput, TaskParameters, TaskRecord, TaskStatus};
use botkit_core::dto::task::FinishStatus;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{BotRunner, RunOutcome, RunServices, describe_output, execute_task};
use crate::config::AuthFailurePolicy;
use crate::error::{AuthenticationError, TaskExecutionError};
use crate::journal::RunLog;
use crate::notify::{NotificationSink, TelegramNotifier};
use crate::resource::ResourceReport;
use crate::task::TaskBody;

/// Credential store entry holding the messaging token
const TELEGRAM_CREDENTIAL_LABEL: &str = "Telegram";
const TELEGRAM_CREDENTIAL_KEY: &str = "token";

/// Calls the runner makes against the orchestration service
#[async_trait]
pub trait OrchestrationApi: Send + Sync {
    async fn login(&self, login: &str, key: &str) -> Result<(), ClientError>;

    async fn get_task(&self, task_id: u64) -> Result<TaskRecord, ClientError>;

    async fn finish_task(
        &self,
        task_id: u64,
        status: FinishStatus,
        message: &str,
    ) -> Result<(), ClientError>;

    async fn report_error(&self, task_id: u64, message: &str, trace: &str)
    -> Result<(), ClientError>;

    /// Uploads a file as an artifact of the task
    async fn upload_artifact(&self, task_id: u64, name: &str, path: &Path)
    -> Result<(), ClientError>;

    async fn get_credential(&self, label: &str, key: &str) -> Result<String, ClientError>;
}

#[async_trait]
impl OrchestrationApi for OrchestratorClient {
    async fn login(&self, login: &str, key: &str) -> Result<(), ClientError> {
        OrchestratorClient::login(self, login, key).await
    }

    async fn get_task(&self, task_id: u64) -> Result<TaskRecord, ClientError> {
        OrchestratorClient::get_task(self, task_id).await
    }

    async fn finish_task(
        &self,
        task_id: u64,
        status: FinishStatus,
        message: &str,
    ) -> Result<(), ClientError> {
        OrchestratorClient::finish_task(self, task_id, status, message).await
    }

    async fn report_error(
        &self,
        task_id: u64,
        message: &str,
        trace: &str,
    ) -> Result<(), ClientError> {
        OrchestratorClient::report_error(self, task_id, message, trace).await
    }

    async fn upload_artifact(
        &self,
        task_id: u64,
        name: &str,
        path: &Path,
    ) -> Result<(), ClientError> {
        let artifact = OrchestratorClient::upload_artifact(self, task_id, name, path).await?;
        debug!("Uploaded artifact {} for task {}", artifact.id, task_id);
        Ok(())
    }

    async fn get_credential(&self, label: &str, key: &str) -> Result<String, ClientError> {
        OrchestratorClient::get_credential(self, label, key).await
    }
}

/// Service handle plus the credentials to log in with
#[derive(Clone)]
pub struct OrchestratorConnection {
    pub api: Arc<dyn OrchestrationApi>,
    pub login: String,
    pub key: String,
}

/// Runs the task body for a remote task record
pub struct OrchestratedRunner {
    body: Arc<dyn TaskBody>,
    connection: Option<OrchestratorConnection>,
    task_id: Option<u64>,
    policy: AuthFailurePolicy,
    telegram_chat_id: Option<String>,
    task: Option<TaskRecord>,
}

impl OrchestratedRunner {
    /// Creates a runner
    ///
    /// # Arguments
    /// * `body` - Task body to execute
    /// * `connection` - `None` when the orchestrator URL or credentials are missing
    /// * `task_id` - Remote task of this execution
    /// * `policy` - What to do when login fails
    pub fn new(
        body: Arc<dyn TaskBody>,
        connection: Option<OrchestratorConnection>,
        task_id: Option<u64>,
        policy: AuthFailurePolicy,
    ) -> Self {
        Self {
            body,
            connection,
            task_id,
            policy,
            telegram_chat_id: None,
            task: None,
        }
    }

    /// Look up the messaging token in the credential store when none is configured
    pub fn with_telegram_chat(mut self, chat_id: Option<String>) -> Self {
        self.telegram_chat_id = chat_id;
        self
    }

    /// Task record of the last run, with its final local status
    pub fn task(&self) -> Option<&TaskRecord> {
        self.task.as_ref()
    }

    async fn authenticate(&self) -> Result<Arc<dyn OrchestrationApi>, AuthenticationError> {
        let connection = self
            .connection
            .as_ref()
            .ok_or(AuthenticationError::MissingCredentials(
                "ORCHESTRATOR_URL, ORCHESTRATOR_LOGIN or ORCHESTRATOR_KEY",
            ))?;

        if self.task_id.is_none() {
            return Err(AuthenticationError::MissingCredentials(
                "ORCHESTRATOR_TASK_ID",
            ));
        }

        connection
            .api
            .login(&connection.login, &connection.key)
            .await?;
        Ok(connection.api.clone())
    }

    /// Fills in the notifier from the credential store; failures only disable alerts
    async fn resolve_notifier(
        &self,
        api: &dyn OrchestrationApi,
        notifications: &mut NotificationSink,
        log: &RunLog,
    ) {
        if notifications.is_enabled() {
            return;
        }
        let Some(chat_id) = &self.telegram_chat_id else {
            return;
        };

        match api
            .get_credential(TELEGRAM_CREDENTIAL_LABEL, TELEGRAM_CREDENTIAL_KEY)
            .await
        {
            Ok(token) => {
                info!("Telegram token retrieved from the credential store");
                let notifier = TelegramNotifier::new(TelegramClient::new(token), chat_id.clone());
                notifications.enable(Arc::new(notifier));
            }
            Err(e) => log.warning(format!(
                "Failed to retrieve Telegram token, failure alerts disabled: {}",
                e
            )),
        }
    }

    /// Steps 1 to 3: log in, fetch the task and run the body
    async fn prepare_and_execute(
        &self,
        log: &RunLog,
        notifications: &mut NotificationSink,
        max_retries: u32,
    ) -> Stage {
        let api = match self.authenticate().await {
            Ok(api) => {
                info!("Authenticated with the orchestration service");
                Some(api)
            }
            Err(e) if self.policy.continues() => {
                log.warning(format!(
                    "Authentication failed, continuing without task parameters ({:?} policy): {}",
                    self.policy, e
                ));
                None
            }
            Err(e) => return Stage::Aborted(format!("Authentication failed: {}", e)),
        };

        let task = match (&api, self.task_id) {
            (Some(api), Some(task_id)) => {
                self.resolve_notifier(api.as_ref(), notifications, log)
                    .await;

                let task = match api.get_task(task_id).await {
                    Ok(task) => task,
                    Err(e) => {
                        return Stage::Aborted(format!("Failed to fetch task {}: {}", task_id, e));
                    }
                };
                if task.status().is_terminal() {
                    return Stage::Aborted(format!(
                        "Task {} is already {}, refusing to run it again",
                        task_id,
                        task.status()
                    ));
                }
                task
            }
            _ => TaskRecord::new(
                self.task_id.unwrap_or_default(),
                TaskParameters::new(),
                TaskStatus::Running,
            ),
        };
        log.info(format!("Task ID is: {}", task.id()));
        log.info(format!("Task has {} parameter(s)", task.parameters().len()));

        let result = execute_task(&self.body, task.parameters(), max_retries, log).await;

        Stage::Executed { api, task, result }
    }

    /// Reports a successful body to the service
    async fn report_success(
        &self,
        api: &dyn OrchestrationApi,
        task: &mut TaskRecord,
        output: &TaskOutput,
        report: &ResourceReport,
        log: &RunLog,
    ) -> Result<(), ClientError> {
        let mut message = format!(
            "Execution time: {}. Resource usage at end of execution: {}",
            report.elapsed_display(),
            report.exit
        );
        let details = describe_output(output);
        if !details.is_empty() {
            message.push_str(&format!(". {}", details));
        }

        let status = FinishStatus::Success;
        api.finish_task(task.id(), status, &message).await?;
        mark(task, status.task_status(), log);
        log.info(format!("Task {} marked as finished", task.id()));
        Ok(())
    }

    /// Reports a failed body to the service
    async fn report_failure(
        &self,
        api: &dyn OrchestrationApi,
        task: &mut TaskRecord,
        err: &TaskExecutionError,
        log: &RunLog,
    ) -> Result<(), ClientError> {
        // The error report is informational; the task still has to be closed
        if let Err(e) = api.report_error(task.id(), &err.message, &err.trace).await {
            log.warning(format!("Failed to post error report for task {}: {}", task.id(), e));
        }
        let status = FinishStatus::Failed;
        api.finish_task(task.id(), status, &err.message).await?;
        mark(task, status.task_status(), log);
        log.info(format!("Task {} marked as failed", task.id()));
        Ok(())
    }

    async fn upload_log(
        &self,
        api: &dyn OrchestrationApi,
        task: &TaskRecord,
        log: &RunLog,
    ) -> Result<(), ClientError> {
        let name = log.file_name();
        // Logged first so the record is part of the uploaded file
        log.info(format!("Uploading log file '{}' as task artifact", name));
        api.upload_artifact(task.id(), &name, log.path()).await
    }

    /// Closes the remote task and uploads the run log
    ///
    /// Both steps always run; the returned list names every step that failed.
    async fn publish(
        &self,
        api: &dyn OrchestrationApi,
        task: &mut TaskRecord,
        result: &Result<TaskOutput, TaskExecutionError>,
        report: &ResourceReport,
        log: &RunLog,
    ) -> Vec<String> {
        let mut problems = Vec::new();

        let closed = match result {
            Ok(output) => self.report_success(api, task, output, report, log).await,
            Err(err) => self.report_failure(api, task, err, log).await,
        };
        if let Err(e) = closed {
            problems.push(format!("status update failed: {}", e));
        }
        if let Err(e) = self.upload_log(api, task, log).await {
            problems.push(format!("log upload failed: {}", e));
        }

        problems
    }

    /// Service handle for reporting after a skip-fetch run
    ///
    /// The first login failed, so this logs in once more. Without a session
    /// the task cannot be reported and the outcome is left to the body.
    async fn relogin_for_report(&self, log: &RunLog) -> Option<Arc<dyn OrchestrationApi>> {
        let Some(task_id) = self.task_id else {
            log.warning("No task id configured, task status not reported");
            return None;
        };
        let connection = match &self.connection {
            Some(connection) => connection,
            None => {
                log.warning(format!(
                    "No orchestrator connection, task {} status not reported",
                    task_id
                ));
                return None;
            }
        };

        match connection.api.login(&connection.login, &connection.key).await {
            Ok(()) => {
                info!("Re-authenticated to report task {}", task_id);
                Some(connection.api.clone())
            }
            Err(e) => {
                log.warning(format!(
                    "Login retry failed, task {} status not reported: {}",
                    task_id, e
                ));
                None
            }
        }
    }

    /// Ends the run as failed without a task-body error
    async fn fail(&self, services: &RunServices, message: String) -> RunOutcome {
        services.log.error(message.clone());
        services
            .notifications
            .notify_failure(&message, services.log.path())
            .await;
        RunOutcome::failure(message)
    }
}

/// Where the run stands once the resource window closes
enum Stage {
    /// Login or task fetch failed; the body never ran
    Aborted(String),
    Executed {
        api: Option<Arc<dyn OrchestrationApi>>,
        task: TaskRecord,
        result: Result<TaskOutput, TaskExecutionError>,
    },
}

/// Applies a status change locally; the service already accepted it
fn mark(task: &mut TaskRecord, status: TaskStatus, log: &RunLog) {
    if let Err(e) = task.transition(status) {
        log.warning(e.to_string());
    }
}

#[async_trait]
impl BotRunner for OrchestratedRunner {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Orchestrated
    }

    async fn run(&mut self, ctx: RunContext, mut services: RunServices) -> RunOutcome {
        services.log.info(format!(
            "Bot '{}' execution started (mode: {}, run: {})",
            ctx.bot_id(),
            ctx.mode(),
            ctx.run_id()
        ));

        let (stage, report) = services
            .resources
            .measure(self.prepare_and_execute(
                &services.log,
                &mut services.notifications,
                services.max_retries,
            ))
            .await;

        let (api, mut task, result) = match stage {
            Stage::Aborted(message) => return self.fail(&services, message).await,
            Stage::Executed { api, task, result } => (api, task, result),
        };

        let reporter = match api {
            Some(api) => Some(api),
            None if self.policy == AuthFailurePolicy::SkipFetch => {
                self.relogin_for_report(&services.log).await
            }
            None => None,
        };

        match &result {
            Ok(_) => services.log.info(format!(
                "Bot '{}' execution completed. Execution time: {}",
                ctx.bot_id(),
                report.elapsed_display()
            )),
            Err(err) => services.log.append(
                LogRecord::error(format!("Bot '{}' execution failed: {}", ctx.bot_id(), err))
                    .with_trace(err.trace.clone()),
            ),
        }

        let problems = match &reporter {
            Some(api) => {
                self.publish(api.as_ref(), &mut task, &result, &report, &services.log)
                    .await
            }
            None => {
                let status = match &result {
                    Ok(_) => TaskStatus::Finished,
                    Err(_) => TaskStatus::Error,
                };
                mark(&mut task, status, &services.log);
                Vec::new()
            }
        };

        let outcome = match result {
            Ok(_) if problems.is_empty() => RunOutcome::Success,
            Ok(_) => {
                self.fail(
                    &services,
                    format!(
                        "Failed to report task {} outcome: {}",
                        task.id(),
                        problems.join("; ")
                    ),
                )
                .await
            }
            Err(err) => {
                for problem in &problems {
                    services.log.error(format!(
                        "Failed to report task {} failure: {}",
                        task.id(),
                        problem
                    ));
                }

                services
                    .notifications
                    .notify_failure(&err.message, services.log.path())
                    .await;
                RunOutcome::failure(err.to_string())
            }
        };

        self.task = Some(task);
        outcome
    }
}
