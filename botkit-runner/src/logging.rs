//! Tracing setup
//!
//! Two layers share one `RUST_LOG` filter: a console layer on stderr and a
//! file layer writing into the run log. Journal records are already in the
//! file, so the file layer skips their console mirror events.

use anyhow::{Context, Result};
use tracing_subscriber::filter::{FilterExt, filter_fn};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::journal::{JOURNAL_TARGET, RunLog};

const DEFAULT_LOG_FILTER: &str = "botkit=info,botkit_runner=info,botkit_client=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber for this process
pub fn init(run_log: &RunLog) -> Result<()> {
    let not_journal = filter_fn(|meta| meta.target() != JOURNAL_TARGET);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(run_log.clone())
                .with_ansi(false)
                .with_filter(env_filter().and(not_journal)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")
}
