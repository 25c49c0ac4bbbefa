//! Task body extension point
//!
//! The automation logic of a bot lives behind [`TaskBody`]. Runners hand it
//! the task parameters and turn its result into log records, remote status
//! updates and an exit code.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use botkit_core::domain::task::{TaskOutput, TaskParameters};
use tracing::info;

/// The automation work a bot performs
#[async_trait]
pub trait TaskBody: Send + Sync {
    /// Executes the task once
    ///
    /// # Arguments
    /// * `params` - Task parameters (remote task record or `--param` flags)
    ///
    /// # Returns
    /// What was done, reported in the finish message
    async fn execute(&self, params: &TaskParameters) -> Result<TaskOutput>;
}

#[async_trait]
impl<F> TaskBody for F
where
    F: Fn(&TaskParameters) -> Result<TaskOutput> + Send + Sync,
{
    async fn execute(&self, params: &TaskParameters) -> Result<TaskOutput> {
        self(params)
    }
}

/// Demonstration body shipped with the binary
///
/// Recognized parameters:
/// - `items`: number of items to process (default 3)
/// - `fail`: when true, fails after logging its input
pub struct SampleTask;

const DEFAULT_ITEMS: u64 = 3;

#[async_trait]
impl TaskBody for SampleTask {
    async fn execute(&self, params: &TaskParameters) -> Result<TaskOutput> {
        info!("Task parameters: {}", describe(params));

        if params.get_bool("fail").unwrap_or(false) {
            bail!("sample task asked to fail (fail=true)");
        }

        let items = match params.get("items") {
            Some(value) => value
                .as_u64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                .context("parameter 'items' must be a non-negative integer")?,
            None => DEFAULT_ITEMS,
        };

        for item in 1..=items {
            info!("Processing item {}/{}", item, items);
            tokio::task::yield_now().await;
        }

        Ok(TaskOutput {
            items_processed: Some(items),
            summary: None,
        })
    }
}

fn describe(params: &TaskParameters) -> String {
    if params.is_empty() {
        return "(none)".to_string();
    }
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    pairs.sort();
    pairs.join(", ")
}
