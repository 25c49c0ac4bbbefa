//! Execution mode selection
//!
//! The `--environment` flag picks the runner. Parsing happens before any
//! runner is built, so an unknown value never constructs one.

use botkit_client::OrchestratorClient;
use botkit_core::domain::run::{ExecutionMode, InvalidModeError};
use botkit_core::domain::task::TaskParameters;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::runner::{BotRunner, LocalRunner, OrchestratedRunner, OrchestratorConnection};
use crate::task::TaskBody;

/// Builds the runner for each execution mode
pub trait RunnerFactory: Send + Sync {
    fn local(&self) -> Box<dyn BotRunner>;

    fn orchestrated(&self) -> Box<dyn BotRunner>;
}

/// Maps the execution-mode flag to a runner
pub struct ModeSelector<F> {
    factory: F,
}

impl<F: RunnerFactory> ModeSelector<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Returns the runner for `flag` (`maestro` or `local`)
    pub fn select(&self, flag: &str) -> Result<Box<dyn BotRunner>, InvalidModeError> {
        let mode: ExecutionMode = flag.parse()?;
        debug!("Execution mode '{}' selected", mode);

        Ok(match mode {
            ExecutionMode::Local => self.factory.local(),
            ExecutionMode::Orchestrated => self.factory.orchestrated(),
        })
    }
}

/// Factory wiring runners from the loaded configuration
pub struct DefaultRunnerFactory {
    config: Config,
    body: Arc<dyn TaskBody>,
    local_params: TaskParameters,
}

impl DefaultRunnerFactory {
    /// # Arguments
    /// * `config` - Validated runner configuration
    /// * `body` - Task body shared by both runners
    /// * `local_params` - Parameters for local runs
    pub fn new(config: Config, body: Arc<dyn TaskBody>, local_params: TaskParameters) -> Self {
        Self {
            config,
            body,
            local_params,
        }
    }

    fn connection(&self) -> Option<OrchestratorConnection> {
        let settings = &self.config.orchestrator;
        match (&settings.url, &settings.login, &settings.key) {
            (Some(url), Some(login), Some(key)) => Some(OrchestratorConnection {
                api: Arc::new(OrchestratorClient::new(url.clone())),
                login: login.clone(),
                key: key.clone(),
            }),
            _ => None,
        }
    }
}

impl RunnerFactory for DefaultRunnerFactory {
    fn local(&self) -> Box<dyn BotRunner> {
        Box::new(LocalRunner::new(
            self.body.clone(),
            self.local_params.clone(),
        ))
    }

    fn orchestrated(&self) -> Box<dyn BotRunner> {
        // A configured token wins over the credential store
        let chat_for_lookup = match self.config.telegram.token {
            Some(_) => None,
            None => self.config.telegram.chat_id.clone(),
        };

        Box::new(
            OrchestratedRunner::new(
                self.body.clone(),
                self.connection(),
                self.config.orchestrator.task_id,
                self.config.auth_failure_policy,
            )
            .with_telegram_chat(chat_for_lookup),
        )
    }
}
