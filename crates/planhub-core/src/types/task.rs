//! Task records as served by the backend.

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task as returned by the backend.
///
/// The client holds transient, UI-scoped copies with no caching
/// guarantees beyond "last fetch wins".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned task id.
    pub id: Uuid,
    /// Short title shown in lists.
    pub title: String,
    /// Longer free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional due date (calendar date, no time component).
    #[serde(default)]
    pub due_date: Option<Date>,
    /// When the task was created.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    /// When the task was last updated.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Short title shown in lists.
    pub title: String,
    /// Longer free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,
}

impl NewTask {
    /// Creates a task payload with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the due date.
    pub fn with_due_date(mut self, due_date: Date) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Payload for updating a task. Fields left as `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// New title, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New due date, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Date>,
}
