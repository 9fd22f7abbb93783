// tasks/mod.rs — Task service: validation, defaults, and completion updates.
//
// Sits between the REST layer and the store. All required-field checks and
// default values live here, not in the storage schema.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::storage::{Storage, TaskRow};

/// A validated-on-entry task creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: String,
    /// Defaults to the creation time when absent.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// Errors surfaced by the task service.
///
/// `Validation` and `NotFound` are recoverable — clients render the message
/// and stay operable. `Storage` wraps unexpected database failures.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),
    #[error("task '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct TaskService {
    storage: Storage,
}

impl TaskService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// All tasks, unordered. Display ordering is a presentation concern.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>, TaskError> {
        Ok(self.storage.list_tasks().await?)
    }

    /// Create a task. Name and description must be non-empty after trimming;
    /// a missing deadline defaults to the creation time.
    pub async fn create_task(&self, req: CreateTaskRequest) -> Result<TaskRow, TaskError> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(TaskError::Validation("name must not be empty".to_string()));
        }
        let description = req.description.trim();
        if description.is_empty() {
            return Err(TaskError::Validation(
                "description must not be empty".to_string(),
            ));
        }

        let deadline = req.deadline.unwrap_or_else(Utc::now).to_rfc3339();
        Ok(self.storage.insert_task(name, description, &deadline).await?)
    }

    /// Set the completed flag. Completion is never inferred — this explicit
    /// update is the only way it changes.
    pub async fn set_completed(&self, id: &str, completed: bool) -> Result<TaskRow, TaskError> {
        self.storage
            .update_task(id, completed)
            .await?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // File-backed throwaway store — a pool over `sqlite::memory:` gives
    // every pooled connection its own database.
    async fn test_service() -> TaskService {
        let dir = tempfile::tempdir().unwrap().keep();
        let url = format!("sqlite://{}/todos.db", dir.display());
        let storage = Storage::connect(&url, 0).await.unwrap();
        TaskService::new(storage)
    }

    fn req(name: &str, description: &str, deadline: Option<DateTime<Utc>>) -> CreateTaskRequest {
        CreateTaskRequest {
            name: name.to_string(),
            description: description.to_string(),
            deadline,
        }
    }

    #[tokio::test]
    async fn empty_name_is_a_validation_error() {
        let svc = test_service().await;
        let err = svc.create_task(req("", "x", None)).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        // Whitespace-only counts as empty too.
        let err = svc.create_task(req("   ", "x", None)).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_description_is_a_validation_error() {
        let svc = test_service().await;
        let err = svc.create_task(req("x", "", None)).await.unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_deadline_defaults_to_creation_time() {
        let svc = test_service().await;
        let before = Utc::now();
        let task = svc.create_task(req("x", "y", None)).await.unwrap();
        let after = Utc::now();

        let deadline = DateTime::parse_from_rfc3339(task.deadline.as_deref().unwrap())
            .unwrap()
            .with_timezone(&Utc);
        assert!(deadline >= before && deadline <= after);
        assert!(!task.completed);
    }

    #[tokio::test]
    async fn name_and_description_are_trimmed() {
        let svc = test_service().await;
        let task = svc
            .create_task(req("  Write spec  ", "  finish doc ", None))
            .await
            .unwrap();
        assert_eq!(task.name, "Write spec");
        assert_eq!(task.description, "finish doc");
    }

    #[tokio::test]
    async fn set_completed_on_unknown_id_is_not_found() {
        let svc = test_service().await;
        let err = svc.set_completed("unknown", true).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
    }

    #[tokio::test]
    async fn double_toggle_restores_original_state() {
        let svc = test_service().await;
        let task = svc.create_task(req("x", "y", None)).await.unwrap();
        assert!(!task.completed);

        let toggled = svc.set_completed(&task.id, true).await.unwrap();
        assert!(toggled.completed);

        let restored = svc.set_completed(&task.id, false).await.unwrap();
        assert!(!restored.completed);
        assert_eq!(restored.name, task.name);
        assert_eq!(restored.description, task.description);
        assert_eq!(restored.deadline, task.deadline);
    }

    #[tokio::test]
    async fn explicit_deadline_is_kept() {
        let svc = test_service().await;
        let deadline: DateTime<Utc> = "2025-01-01T10:00:00Z".parse().unwrap();
        let task = svc
            .create_task(req("Write spec", "finish doc", Some(deadline)))
            .await
            .unwrap();
        assert_eq!(task.deadline.as_deref(), Some(deadline.to_rfc3339().as_str()));
    }
}
