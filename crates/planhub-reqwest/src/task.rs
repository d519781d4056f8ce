//! Task CRUD scoped to the current session.

use std::fmt;
use std::sync::Arc;

use planhub_core::{AuthCoordinator, Error, NewTask, Result, Task, TaskUpdate};
use uuid::Uuid;

use crate::client::ApiClient;

/// Tracing target for task operations.
pub const TRACING_TARGET: &str = "planhub_reqwest::task";

/// Task CRUD against `/tasks`, scoped server-side to the caller's
/// credential.
///
/// The client keeps no task cache; every read reflects the backend at
/// fetch time ("last fetch wins"). All operations fail with
/// `NotSignedIn` before touching the network when no session exists.
#[derive(Clone)]
pub struct TaskService {
    client: ApiClient,
    coordinator: Arc<AuthCoordinator>,
}

impl fmt::Debug for TaskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskService").finish_non_exhaustive()
    }
}

impl TaskService {
    /// Creates a task service over the given client and coordinator.
    pub fn new(client: ApiClient, coordinator: Arc<AuthCoordinator>) -> Self {
        Self {
            client,
            coordinator,
        }
    }

    fn require_session(&self) -> Result<()> {
        if self.coordinator.is_logged_in() {
            Ok(())
        } else {
            Err(Error::not_signed_in())
        }
    }

    /// Lists the caller's tasks.
    pub async fn list(&self) -> Result<Vec<Task>> {
        self.require_session()?;
        self.client.get_json(&["tasks"]).await
    }

    /// Fetches a single task.
    pub async fn get(&self, id: Uuid) -> Result<Task> {
        self.require_session()?;
        self.client.get_json(&["tasks", &id.to_string()]).await
    }

    /// Creates a task.
    pub async fn create(&self, task: &NewTask) -> Result<Task> {
        self.require_session()?;
        tracing::debug!(target: TRACING_TARGET, title = %task.title, "Creating task");
        self.client.post_json(&["tasks"], task).await
    }

    /// Updates a task.
    pub async fn update(&self, id: Uuid, update: &TaskUpdate) -> Result<Task> {
        self.require_session()?;
        self.client.put_json(&["tasks", &id.to_string()], update).await
    }

    /// Deletes a task.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.require_session()?;
        tracing::debug!(target: TRACING_TARGET, %id, "Deleting task");
        self.client.delete(&["tasks", &id.to_string()]).await
    }
}

#[cfg(test)]
mod tests {
    use planhub_core::auth::mock::MockBackend;
    use planhub_core::{ErrorKind, Identity, SessionStore};

    use super::*;
    use crate::{ApiConfig, CredentialMode};

    fn service() -> TaskService {
        let config = ApiConfig::new("https://api.planhub.app/api/".parse().unwrap())
            .with_credential_mode(CredentialMode::Bearer);
        let client = ApiClient::new(config).unwrap();
        let coordinator = Arc::new(AuthCoordinator::new(
            MockBackend::new(Identity::new("u1")),
            SessionStore::new(),
        ));
        TaskService::new(client, coordinator)
    }

    #[tokio::test]
    async fn test_operations_fail_without_session_before_any_network_call() {
        let tasks = service();

        let error = tasks.list().await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotSignedIn);

        let error = tasks.create(&NewTask::new("title")).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotSignedIn);

        let error = tasks.delete(Uuid::nil()).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NotSignedIn);
    }
}
