//! Task-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use botkit_core::domain::task::TaskRecord;
use botkit_core::dto::task::{ErrorReport, FinishStatus, FinishTaskRequest, TaskResponse};

impl OrchestratorClient {
    // =============================================================================
    // Task Lifecycle
    // =============================================================================

    /// Get the task record for an execution
    ///
    /// # Arguments
    /// * `task_id` - The remote task identifier
    ///
    /// # Returns
    /// The task record with its input parameters
    pub async fn get_task(&self, task_id: u64) -> Result<TaskRecord> {
        let url = self.url(&format!("/api/v2/task/{}", task_id));
        let response = self.authorized(self.client.get(&url))?.send().await?;

        let task: TaskResponse = self.handle_response(response).await?;
        Ok(task.into())
    }

    /// Close a task with its final outcome
    ///
    /// # Arguments
    /// * `task_id` - The remote task identifier
    /// * `status` - Success or failure
    /// * `message` - Human-readable finish message shown by the service
    pub async fn finish_task(
        &self,
        task_id: u64,
        status: FinishStatus,
        message: &str,
    ) -> Result<()> {
        let url = self.url(&format!("/api/v2/task/{}", task_id));
        let response = self
            .authorized(self.client.post(&url))?
            .json(&FinishTaskRequest::new(status, message))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    /// Attach an error report to a task
    ///
    /// # Arguments
    /// * `task_id` - The remote task identifier
    /// * `message` - Short error message
    /// * `trace` - Full error chain
    pub async fn report_error(&self, task_id: u64, message: &str, trace: &str) -> Result<()> {
        let url = self.url("/api/v2/error");
        let response = self
            .authorized(self.client.post(&url))?
            .json(&ErrorReport {
                task_id,
                error_type: "TaskExecutionError".to_string(),
                message: message.to_string(),
                stack_trace: trace.to_string(),
                language: "RUST".to_string(),
            })
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
