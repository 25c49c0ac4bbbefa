//! botkit
//!
//! Runs the bundled task body once, in the mode given by `--environment`.
//!
//! Exit codes:
//! - 0: the run succeeded
//! - 1: the run failed
//! - 2: invalid execution mode or configuration

use anyhow::{Context, Result};
use botkit_client::TelegramClient;
use botkit_core::domain::run::RunContext;
use botkit_runner::cli::Cli;
use botkit_runner::journal::RunLog;
use botkit_runner::notify::{NotificationSink, TelegramNotifier};
use botkit_runner::resource::{ProcSampler, ResourceLogger};
use botkit_runner::{
    BotRunner, Config, DefaultRunnerFactory, ModeSelector, RunOutcome, RunServices, SampleTask,
    logging,
};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let factory =
        DefaultRunnerFactory::new(config.clone(), Arc::new(SampleTask), cli.task_parameters());
    let mut runner = match ModeSelector::new(factory).select(&cli.environment) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    match run(runner.as_mut(), &config).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run(runner: &mut dyn BotRunner, config: &Config) -> Result<RunOutcome> {
    let ctx = RunContext::new(
        runner.mode(),
        config.bot_name.clone(),
        config.log_dir.clone(),
    );

    let log = RunLog::create(&ctx).with_context(|| {
        format!(
            "Failed to create run log in {}",
            config.log_dir.display()
        )
    })?;
    logging::init(&log)?;
    info!("Writing run log to {}", log.path().display());

    let notifications = match (&config.telegram.token, &config.telegram.chat_id) {
        (Some(token), Some(chat_id)) => NotificationSink::new(
            Arc::new(TelegramNotifier::new(
                TelegramClient::new(token.clone()),
                chat_id.clone(),
            )),
            config.bot_name.clone(),
        ),
        _ => NotificationSink::disabled(config.bot_name.clone()),
    };

    let sampler = Arc::new(ProcSampler::new(
        config.cpu_sample_interval,
        config.sample_gpu,
    ));

    let services = RunServices {
        log: log.clone(),
        resources: ResourceLogger::new(sampler, log.clone()),
        notifications,
        max_retries: config.max_retries,
    };

    let outcome = runner.run(ctx, services).await;
    match &outcome {
        RunOutcome::Success => info!("Run finished successfully"),
        RunOutcome::Failure { reason } => error!("Run failed: {}", reason),
    }

    if let Some(dir) = &config.log_archive_dir {
        match log.archive_to(dir) {
            Ok(path) => info!("Run log archived to {}", path.display()),
            Err(e) => warn!("Failed to archive run log to {}: {}", dir.display(), e),
        }
    }

    Ok(outcome)
}
