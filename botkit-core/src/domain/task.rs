//! Task domain types
//!
//! A task record is the orchestration service's view of one execution.
//! It only exists when the bot runs in orchestrated mode.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Remote task status
///
/// `Finished` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Running,
    Finished,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Error)
    }

    /// Maps a service-side state name onto the local status model.
    ///
    /// Every non-terminal remote state (queued, started, running) is `Running`
    /// from the runner's point of view.
    pub fn from_remote_state(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "FINISHED" => TaskStatus::Finished,
            "ERROR" | "FAILED" | "CANCELED" | "CANCELLED" => TaskStatus::Error,
            _ => TaskStatus::Running,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "Running"),
            TaskStatus::Finished => write!(f, "Finished"),
            TaskStatus::Error => write!(f, "Error"),
        }
    }
}

/// A status change that the task lifecycle does not allow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task_id}: cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub task_id: u64,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Input parameters handed to the task body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskParameters(HashMap<String, JsonValue>);

impl TaskParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: JsonValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    /// Reads a boolean, accepting both JSON booleans and "true"/"false" strings
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }
}

impl From<HashMap<String, JsonValue>> for TaskParameters {
    fn from(map: HashMap<String, JsonValue>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, JsonValue)> for TaskParameters {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Remote task record for the current execution
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    id: u64,
    parameters: TaskParameters,
    status: TaskStatus,
}

impl TaskRecord {
    /// Creates a record as fetched from the service
    pub fn new(id: u64, parameters: TaskParameters, status: TaskStatus) -> Self {
        Self {
            id,
            parameters,
            status,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn parameters(&self) -> &TaskParameters {
        &self.parameters
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Moves the record to `to`
    ///
    /// Only `Running -> Finished` and `Running -> Error` are accepted.
    pub fn transition(&mut self, to: TaskStatus) -> Result<(), InvalidTransition> {
        let allowed = self.status == TaskStatus::Running && to.is_terminal();
        if !allowed {
            return Err(InvalidTransition {
                task_id: self.id,
                from: self.status,
                to,
            });
        }

        self.status = to;
        Ok(())
    }
}

/// What the task body reports back on success
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Number of business items handled, when the bot counts them
    pub items_processed: Option<u64>,
    /// Free-form summary appended to the finish message
    pub summary: Option<String>,
}

impl TaskOutput {
    pub fn with_items(items_processed: u64) -> Self {
        Self {
            items_processed: Some(items_processed),
            summary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running_task() -> TaskRecord {
        TaskRecord::new(42, TaskParameters::new(), TaskStatus::Running)
    }

    #[test]
    fn test_running_to_terminal() {
        let mut task = running_task();
        assert!(task.transition(TaskStatus::Finished).is_ok());
        assert_eq!(task.status(), TaskStatus::Finished);

        let mut task = running_task();
        assert!(task.transition(TaskStatus::Error).is_ok());
        assert_eq!(task.status(), TaskStatus::Error);
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [TaskStatus::Finished, TaskStatus::Error] {
            let mut task = TaskRecord::new(7, TaskParameters::new(), terminal);
            for next in [TaskStatus::Running, TaskStatus::Finished, TaskStatus::Error] {
                let err = task.transition(next).unwrap_err();
                assert_eq!(err.from, terminal);
                assert_eq!(err.to, next);
            }
            assert_eq!(task.status(), terminal);
        }
    }

    #[test]
    fn test_running_to_running_rejected() {
        let mut task = running_task();
        assert!(task.transition(TaskStatus::Running).is_err());
    }

    #[test]
    fn test_remote_state_mapping() {
        assert_eq!(TaskStatus::from_remote_state("START"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_remote_state("running"), TaskStatus::Running);
        assert_eq!(TaskStatus::from_remote_state("FINISHED"), TaskStatus::Finished);
        assert_eq!(TaskStatus::from_remote_state("FAILED"), TaskStatus::Error);
    }

    #[test]
    fn test_parameter_accessors() {
        let params: TaskParameters = [
            ("customer".to_string(), json!("acme")),
            ("fail".to_string(), json!(true)),
            ("dry_run".to_string(), json!("false")),
            ("limit".to_string(), json!(10)),
        ]
        .into_iter()
        .collect();

        assert_eq!(params.get_str("customer"), Some("acme"));
        assert_eq!(params.get_bool("fail"), Some(true));
        assert_eq!(params.get_bool("dry_run"), Some(false));
        assert_eq!(params.get_bool("limit"), None);
        assert_eq!(params.get("limit"), Some(&json!(10)));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_parameters_serialize_as_plain_map() {
        let mut params = TaskParameters::new();
        params.insert("a", json!(1));
        assert_eq!(serde_json::to_value(&params).unwrap(), json!({"a": 1}));
    }
}
