//! Task DTOs

use serde::{Deserialize, Serialize};

use crate::domain::task::{TaskParameters, TaskRecord, TaskStatus};

/// Task as returned by `GET /api/v2/task/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: u64,
    pub state: String,
    #[serde(default)]
    pub parameters: TaskParameters,
}

impl From<TaskResponse> for TaskRecord {
    fn from(task: TaskResponse) -> Self {
        TaskRecord::new(
            task.id,
            task.parameters,
            TaskStatus::from_remote_state(&task.state),
        )
    }
}

/// Final outcome reported when closing a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishStatus {
    Success,
    Failed,
}

impl FinishStatus {
    /// Local status the task ends in after this finish request
    pub fn task_status(&self) -> TaskStatus {
        match self {
            FinishStatus::Success => TaskStatus::Finished,
            FinishStatus::Failed => TaskStatus::Error,
        }
    }
}

/// Body of `POST /api/v2/task/{id}` closing the task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishTaskRequest {
    /// Always `FINISHED`; the outcome lives in `finish_status`
    pub state: String,
    pub finish_status: FinishStatus,
    pub finish_message: String,
}

impl FinishTaskRequest {
    pub fn new(finish_status: FinishStatus, finish_message: impl Into<String>) -> Self {
        Self {
            state: "FINISHED".to_string(),
            finish_status,
            finish_message: finish_message.into(),
        }
    }
}

/// Error report attached to a task (`POST /api/v2/error`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub task_id: u64,
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub stack_trace: String,
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_response_into_record() {
        let response: TaskResponse = serde_json::from_value(json!({
            "id": 1234,
            "state": "RUNNING",
            "parameters": {"customer": "acme", "limit": 5}
        }))
        .unwrap();

        let record = TaskRecord::from(response);
        assert_eq!(record.id(), 1234);
        assert_eq!(record.status(), TaskStatus::Running);
        assert_eq!(record.parameters().get_str("customer"), Some("acme"));
    }

    #[test]
    fn test_task_response_without_parameters() {
        let response: TaskResponse =
            serde_json::from_value(json!({"id": 1, "state": "START"})).unwrap();
        assert!(response.parameters.is_empty());
    }

    #[test]
    fn test_finish_request_wire_shape() {
        let body = FinishTaskRequest::new(FinishStatus::Failed, "boom");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"state": "FINISHED", "finishStatus": "FAILED", "finishMessage": "boom"})
        );
        assert_eq!(FinishStatus::Failed.task_status(), TaskStatus::Error);
        assert_eq!(FinishStatus::Success.task_status(), TaskStatus::Finished);
    }
}
