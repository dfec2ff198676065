//! Task operations with a read-through, per-user cache.
//!
//! Reads consult the cache first and populate it on a miss. Every write to a
//! user's tasks deletes that user's entry. Nothing serializes a concurrent
//! read-repopulate against an invalidation, so a stale snapshot can survive
//! for at most one TTL.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{NewTask, OwnerSummary, Task, TaskPatch, TaskWithOwner, User};
use crate::services::cache::TaskCache;
use crate::services::store::TaskStore;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    cache: Arc<dyn TaskCache>,
    ttl: Duration,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, cache: Arc<dyn TaskCache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub fn cache_name(&self) -> &'static str {
        self.cache.name()
    }

    pub async fn list_tasks(&self, user_id: Uuid) -> AppResult<Vec<Task>> {
        match self.cache.get(user_id).await {
            Ok(Some(tasks)) => {
                debug!("Task cache hit for user {}", user_id);
                return Ok(tasks);
            }
            Ok(None) => debug!("Task cache miss for user {}", user_id),
            Err(e) => warn!("Task cache read failed for user {}: {}", user_id, e),
        }

        let tasks = self.store.tasks_for_owner(user_id).await?;
        if let Err(e) = self.cache.put(user_id, &tasks, self.ttl).await {
            warn!("Task cache write failed for user {}: {}", user_id, e);
        }
        Ok(tasks)
    }

    pub async fn create_task(&self, user_id: Uuid, fields: NewTask) -> AppResult<Task> {
        fields.validate()?;
        let task = Task::new(
            user_id,
            fields.title,
            fields.description,
            fields.status.unwrap_or_default(),
        );
        let task = self.store.insert_task(task).await?;
        self.invalidate(user_id).await;
        debug!("Created task {} for user {}", task.id, user_id);
        Ok(task)
    }

    /// The cache entry is dropped even when the task turns out not to exist.
    pub async fn update_task(&self, user_id: Uuid, task_id: Uuid, patch: TaskPatch) -> AppResult<Task> {
        if patch.is_empty() {
            return Err(AppError::NoFieldsProvided);
        }
        patch.validate()?;

        let updated = self.store.update_owned(user_id, task_id, &patch).await?;
        self.invalidate(user_id).await;
        updated.ok_or_else(task_not_found)
    }

    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> AppResult<Task> {
        let deleted = self.store.delete_owned(user_id, task_id).await?;
        self.invalidate(user_id).await;
        deleted.ok_or_else(task_not_found)
    }

    /// Uncached view of every task, with owners resolved from `users`.
    pub async fn list_all_tasks(&self, users: &[User]) -> AppResult<Vec<TaskWithOwner>> {
        let owners: HashMap<Uuid, OwnerSummary> = users
            .iter()
            .map(|user| (user.id, OwnerSummary::from(user)))
            .collect();

        Ok(self
            .store
            .all_tasks()
            .await?
            .into_iter()
            .map(|task| {
                let owner = owners.get(&task.owner_id).cloned();
                TaskWithOwner { task, owner }
            })
            .collect())
    }

    /// Deletes without ownership scoping; the former owner's entry is dropped
    /// so their next listing reflects the removal.
    pub async fn delete_any_task(&self, task_id: Uuid) -> AppResult<Task> {
        let task = self
            .store
            .delete_task(task_id)
            .await?
            .ok_or_else(task_not_found)?;
        self.invalidate(task.owner_id).await;
        Ok(task)
    }

    async fn invalidate(&self, user_id: Uuid) {
        if let Err(e) = self.cache.invalidate(user_id).await {
            warn!("Task cache invalidation failed for user {}: {}", user_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::services::cache::{MemoryCache, NoopCache};
    use crate::services::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Cache whose backend is always down.
    struct BrokenCache;

    #[async_trait]
    impl TaskCache for BrokenCache {
        async fn get(&self, _user_id: Uuid) -> AppResult<Option<Vec<Task>>> {
            Err(AppError::Internal("cache offline".into()))
        }
        async fn put(&self, _user_id: Uuid, _tasks: &[Task], _ttl: Duration) -> AppResult<()> {
            Err(AppError::Internal("cache offline".into()))
        }
        async fn invalidate(&self, _user_id: Uuid) -> AppResult<()> {
            Err(AppError::Internal("cache offline".into()))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    /// Counts invalidations on top of a working cache.
    #[derive(Default)]
    struct CountingCache {
        inner: MemoryCache,
        invalidations: AtomicUsize,
    }

    #[async_trait]
    impl TaskCache for CountingCache {
        async fn get(&self, user_id: Uuid) -> AppResult<Option<Vec<Task>>> {
            self.inner.get(user_id).await
        }
        async fn put(&self, user_id: Uuid, tasks: &[Task], ttl: Duration) -> AppResult<()> {
            self.inner.put(user_id, tasks, ttl).await
        }
        async fn invalidate(&self, user_id: Uuid) -> AppResult<()> {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            self.inner.invalidate(user_id).await
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn service_with(cache: Arc<dyn TaskCache>) -> (TaskService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = TaskService::new(store.clone(), cache, Duration::from_secs(300));
        (service, store)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: "2%".into(),
            status: None,
        }
    }

    #[tokio::test]
    async fn created_task_defaults_to_pending() {
        let (service, _) = service_with(Arc::new(MemoryCache::new()));
        let user = Uuid::new_v4();

        let task = service.create_task(user, new_task("Buy milk")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        let listed = service.list_tasks(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn cache_hit_returns_snapshot_even_if_store_changed() {
        let (service, store) = service_with(Arc::new(MemoryCache::new()));
        let user = Uuid::new_v4();
        service.create_task(user, new_task("Buy milk")).await.unwrap();

        let first = service.list_tasks(user).await.unwrap();
        // Bypass the service so no invalidation happens.
        store
            .insert_task(Task::new(user, "Sneaky".into(), "x".into(), TaskStatus::Pending))
            .await
            .unwrap();
        let second = service.list_tasks(user).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.tasks_for_owner(user).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn writes_invalidate_so_reads_converge() {
        let (service, _) = service_with(Arc::new(MemoryCache::new()));
        let user = Uuid::new_v4();

        let task = service.create_task(user, new_task("Buy milk")).await.unwrap();
        service.list_tasks(user).await.unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..TaskPatch::default()
        };
        service.update_task(user, task.id, patch).await.unwrap();
        let listed = service.list_tasks(user).await.unwrap();
        assert_eq!(listed[0].status, TaskStatus::Completed);

        service.create_task(user, new_task("Walk dog")).await.unwrap();
        assert_eq!(service.list_tasks(user).await.unwrap().len(), 2);

        service.delete_task(user, task.id).await.unwrap();
        let listed = service.list_tasks(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Walk dog");
    }

    #[tokio::test]
    async fn empty_patch_is_rejected_without_mutation() {
        let cache = Arc::new(CountingCache::default());
        let (service, store) = service_with(cache.clone());
        let user = Uuid::new_v4();
        let task = service.create_task(user, new_task("Buy milk")).await.unwrap();
        let before = cache.invalidations.load(Ordering::SeqCst);

        let err = service
            .update_task(user, task.id, TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoFieldsProvided));
        assert_eq!(store.tasks_for_owner(user).await.unwrap(), vec![task]);
        assert_eq!(cache.invalidations.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn foreign_tasks_are_not_found_but_still_invalidate() {
        let cache = Arc::new(CountingCache::default());
        let (service, store) = service_with(cache.clone());
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let bobs = service.create_task(bob, new_task("Bob's task")).await.unwrap();
        let before = cache.invalidations.load(Ordering::SeqCst);

        let patch = TaskPatch {
            title: Some("Mine now".into()),
            ..TaskPatch::default()
        };
        let err = service.update_task(alice, bobs.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = service.delete_task(alice, bobs.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(cache.invalidations.load(Ordering::SeqCst), before + 2);
        assert!(service.list_tasks(alice).await.unwrap().is_empty());
        assert_eq!(store.tasks_for_owner(bob).await.unwrap(), vec![bobs]);
    }

    #[tokio::test]
    async fn broken_cache_never_fails_requests() {
        let (service, _) = service_with(Arc::new(BrokenCache));
        let user = Uuid::new_v4();

        let task = service.create_task(user, new_task("Buy milk")).await.unwrap();
        assert_eq!(service.list_tasks(user).await.unwrap(), vec![task.clone()]);
        service.delete_task(user, task.id).await.unwrap();
        assert!(service.list_tasks(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pass_through_mode_reads_the_store_every_time() {
        let (service, store) = service_with(Arc::new(NoopCache));
        let user = Uuid::new_v4();
        service.create_task(user, new_task("Buy milk")).await.unwrap();
        service.list_tasks(user).await.unwrap();

        store
            .insert_task(Task::new(user, "Direct".into(), "x".into(), TaskStatus::Pending))
            .await
            .unwrap();
        assert_eq!(service.list_tasks(user).await.unwrap().len(), 2);
        assert_eq!(service.cache_name(), "disabled");
    }

    #[tokio::test]
    async fn admin_delete_refreshes_owner_listing() {
        let (service, _) = service_with(Arc::new(MemoryCache::new()));
        let owner = Uuid::new_v4();
        let task = service.create_task(owner, new_task("Buy milk")).await.unwrap();
        assert_eq!(service.list_tasks(owner).await.unwrap().len(), 1);

        let deleted = service.delete_any_task(task.id).await.unwrap();
        assert_eq!(deleted.id, task.id);
        assert!(service.list_tasks(owner).await.unwrap().is_empty());

        let err = service.delete_any_task(task.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn admin_listing_resolves_owners() {
        let (service, _) = service_with(Arc::new(NoopCache));
        let owner = User::new("alice".into(), "alice@example.com".into(), "hash".into());
        service.create_task(owner.id, new_task("Buy milk")).await.unwrap();
        service.create_task(Uuid::new_v4(), new_task("Orphan")).await.unwrap();

        let all = service.list_all_tasks(std::slice::from_ref(&owner)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].owner.as_ref().map(|o| o.username.as_str()), Some("alice"));
        assert!(all[1].owner.is_none());
    }
}
