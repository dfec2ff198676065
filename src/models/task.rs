use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::OwnerSummary;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(rename = "userId")]
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(owner_id: Uuid, title: String, description: String, status: TaskStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            status,
            owner_id,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Partial update; only supplied fields change.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Admin view of a task with its owner resolved.
#[derive(Serialize, Debug, Clone)]
pub struct TaskWithOwner {
    #[serde(flatten)]
    pub task: Task,
    pub owner: Option<OwnerSummary>,
}
