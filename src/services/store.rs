//! System-of-record traits and the in-memory implementation.
//!
//! Ownership-scoped task operations look a task up by id *and* owner in one
//! step, so a task owned by someone else is reported exactly like a missing
//! one.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{Role, Task, TaskPatch, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: User) -> AppResult<User>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn update_username(&self, id: Uuid, username: &str) -> AppResult<Option<User>>;
    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: Task) -> AppResult<Task>;
    /// Tasks owned by `owner`, oldest first.
    async fn tasks_for_owner(&self, owner: Uuid) -> AppResult<Vec<Task>>;
    async fn update_owned(&self, owner: Uuid, id: Uuid, patch: &TaskPatch) -> AppResult<Option<Task>>;
    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Task>>;
    async fn all_tasks(&self) -> AppResult<Vec<Task>>;
    /// Deletes regardless of owner.
    async fn delete_task(&self, id: Uuid) -> AppResult<Option<Task>>;
}

pub(crate) fn duplicate_email() -> AppError {
    AppError::Conflict("User already exists".into())
}

#[derive(Default)]
struct Records {
    users: Vec<User>,
    tasks: Vec<Task>,
}

/// Process-local store, used by tests and the `memory` store backend.
#[derive(Default, Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<Records>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut records = self.records.write().await;
        if records.users.iter().any(|u| u.email == user.email) {
            return Err(duplicate_email());
        }
        records.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let records = self.records.read().await;
        Ok(records.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let records = self.records.read().await;
        Ok(records.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_username(&self, id: Uuid, username: &str) -> AppResult<Option<User>> {
        let mut records = self.records.write().await;
        Ok(records.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.username = username.to_string();
            user.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>> {
        let mut records = self.records.write().await;
        Ok(records.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.records.read().await.users.clone())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: Task) -> AppResult<Task> {
        self.records.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn tasks_for_owner(&self, owner: Uuid) -> AppResult<Vec<Task>> {
        let records = self.records.read().await;
        Ok(records
            .tasks
            .iter()
            .filter(|t| t.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn update_owned(&self, owner: Uuid, id: Uuid, patch: &TaskPatch) -> AppResult<Option<Task>> {
        let mut records = self.records.write().await;
        Ok(records
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner_id == owner)
            .map(|task| {
                task.apply(patch);
                task.clone()
            }))
    }

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Task>> {
        let mut records = self.records.write().await;
        let position = records
            .tasks
            .iter()
            .position(|t| t.id == id && t.owner_id == owner);
        Ok(position.map(|i| records.tasks.remove(i)))
    }

    async fn all_tasks(&self) -> AppResult<Vec<Task>> {
        Ok(self.records.read().await.tasks.clone())
    }

    async fn delete_task(&self, id: Uuid) -> AppResult<Option<Task>> {
        let mut records = self.records.write().await;
        let position = records.tasks.iter().position(|t| t.id == id);
        Ok(position.map(|i| records.tasks.remove(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    fn user(email: &str) -> User {
        User::new("alice".into(), email.into(), "hash".into())
    }

    fn task(owner: Uuid, title: &str) -> Task {
        Task::new(owner, title.into(), "desc".into(), TaskStatus::Pending)
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user(user("a@example.com")).await.unwrap();

        let err = store.create_user(user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn role_and_username_updates() {
        let store = MemoryStore::new();
        let created = store.create_user(user("a@example.com")).await.unwrap();

        let updated = store.set_role(created.id, Role::Admin).await.unwrap().unwrap();
        assert_eq!(updated.role, Role::Admin);
        let renamed = store.update_username(created.id, "bob").await.unwrap().unwrap();
        assert_eq!(renamed.username, "bob");
        assert!(store.set_role(Uuid::new_v4(), Role::Admin).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn owned_operations_hide_foreign_tasks() {
        let store = MemoryStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let bobs = store.insert_task(task(bob, "Bob's task")).await.unwrap();

        let patch = TaskPatch {
            title: Some("Hijacked".into()),
            ..TaskPatch::default()
        };
        assert!(store.update_owned(alice, bobs.id, &patch).await.unwrap().is_none());
        assert!(store.delete_owned(alice, bobs.id).await.unwrap().is_none());
        assert!(store.tasks_for_owner(alice).await.unwrap().is_empty());

        let remaining = store.tasks_for_owner(bob).await.unwrap();
        assert_eq!(remaining, vec![bobs]);
    }

    #[tokio::test]
    async fn tasks_listed_in_creation_order() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let first = store.insert_task(task(owner, "first")).await.unwrap();
        let second = store.insert_task(task(owner, "second")).await.unwrap();

        let ids: Vec<Uuid> = store
            .tasks_for_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
